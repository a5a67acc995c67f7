/// One page of a client-side paginated collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number after clamping.
    pub page_number: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

impl<T> Page<T> {
    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages
    }
}

/// Returns page `page_number` of `data`.
///
/// The page number is clamped to `[1, total_pages]`. An empty collection is
/// page 1 of 0. A `page_size` of 0 is treated as 1.
pub fn paginate<T: Clone>(data: &[T], page_size: usize, page_number: usize) -> Page<T> {
    let size = page_size.max(1);
    let total_items = data.len();
    let total_pages = total_items.div_ceil(size);
    let page_number = page_number.clamp(1, total_pages.max(1));

    let start = (page_number - 1) * size;
    let end = (start + size).min(total_items);
    let items = data.get(start..end).map(<[T]>::to_vec).unwrap_or_default();

    Page {
        items,
        page_number,
        total_pages,
        total_items,
    }
}
