use futures_util::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use super::{RemoteResource, ResourceStatus};
use crate::api::{ApiClient, FetchError, FetchResult, Method, decode_value};

/// One resource a view needs, fetched with an authenticated GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSpec {
    pub label: String,
    pub path: String,
}

impl FetchSpec {
    pub fn new(label: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }
}

/// Issues every fetch of a view at once and aggregates the outcome.
#[derive(Debug, Clone)]
pub struct ViewDataLoader {
    client: ApiClient,
}

impl ViewDataLoader {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// Fetches all specs concurrently.
    ///
    /// Results keep the order of `specs`, so when several fail the reported
    /// error is the first listed one, whatever finished first.
    pub async fn load(&self, specs: &[FetchSpec]) -> LoadedView {
        let requests = specs
            .iter()
            .map(|spec| self.client.request(Method::GET, &spec.path, None));
        let results = join_all(requests).await;

        let entries: Vec<LoadedEntry> = specs
            .iter()
            .zip(results)
            .map(|(spec, result)| LoadedEntry {
                label: spec.label.clone(),
                result,
            })
            .collect();

        let view = LoadedView { entries };
        debug!(
            specs = specs.len(),
            status = ?view.status(),
            "view data loaded"
        );
        view
    }
}

#[derive(Debug, Clone)]
struct LoadedEntry {
    label: String,
    result: FetchResult<Value>,
}

/// Aggregated result of [`ViewDataLoader::load`].
#[derive(Debug, Clone)]
pub struct LoadedView {
    entries: Vec<LoadedEntry>,
}

impl LoadedView {
    /// `Ready` only when every fetch succeeded.
    pub fn status(&self) -> ResourceStatus {
        if self.error().is_some() {
            ResourceStatus::Failed
        } else {
            ResourceStatus::Ready
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status() == ResourceStatus::Ready
    }

    /// Error of the first listed failing fetch.
    pub fn error(&self) -> Option<&FetchError> {
        self.entries
            .iter()
            .find_map(|entry| entry.result.as_ref().err())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.label.as_str())
    }

    /// State of a single fetch.
    pub fn resource(&self, label: &str) -> Option<RemoteResource<Value>> {
        self.entry(label)
            .map(|entry| RemoteResource::from_result(entry.result.clone()))
    }

    /// Decodes the body of a successful fetch into `T`.
    ///
    /// # Errors
    /// Returns the fetch's own error, or `InvalidResponse` if the label is
    /// unknown or the body does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self, label: &str) -> FetchResult<T> {
        let entry = self
            .entry(label)
            .ok_or_else(|| FetchError::InvalidResponse(format!("no resource named {label}")))?;
        match &entry.result {
            Ok(value) => decode_value(value.clone()),
            Err(err) => Err(err.clone()),
        }
    }

    /// Converts into the first error or the raw values in listed order.
    ///
    /// # Errors
    /// Returns the error of the first listed failing fetch.
    pub fn into_values(self) -> FetchResult<Vec<Value>> {
        self.entries.into_iter().map(|entry| entry.result).collect()
    }

    fn entry(&self, label: &str) -> Option<&LoadedEntry> {
        self.entries.iter().find(|entry| entry.label == label)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn view(entries: Vec<(&str, FetchResult<Value>)>) -> LoadedView {
        LoadedView {
            entries: entries
                .into_iter()
                .map(|(label, result)| LoadedEntry {
                    label: label.to_string(),
                    result,
                })
                .collect(),
        }
    }

    #[test]
    fn test_ready_only_when_all_succeed() {
        let loaded = view(vec![("a", Ok(json!([1]))), ("b", Ok(json!([2])))]);
        assert!(loaded.is_ready());
        assert_eq!(loaded.decode::<Vec<u8>>("b").unwrap(), vec![2]);
        assert_eq!(loaded.labels().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn test_first_listed_error_wins() {
        let loaded = view(vec![
            ("a", Ok(json!([]))),
            ("b", Err(FetchError::from_status(500, "first"))),
            ("c", Err(FetchError::NetworkError("second".into()))),
        ]);
        assert_eq!(loaded.status(), ResourceStatus::Failed);
        assert_eq!(
            loaded.error(),
            Some(&FetchError::ServerError {
                status: 500,
                message: Some("first".to_string())
            })
        );
        assert!(loaded.resource("a").unwrap().is_ready());
        assert_eq!(
            loaded.resource("c").unwrap().error(),
            Some("Unable to reach the server. Please check your network connection and try again.")
        );
    }

    #[test]
    fn test_decode_errors() {
        let loaded = view(vec![("a", Ok(json!({"not": "a list"})))]);
        assert!(matches!(
            loaded.decode::<Vec<u8>>("a"),
            Err(FetchError::InvalidResponse(_))
        ));
        assert!(matches!(
            loaded.decode::<Value>("missing"),
            Err(FetchError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_into_values() {
        let loaded = view(vec![("a", Ok(json!(1))), ("b", Ok(json!(2)))]);
        assert_eq!(loaded.into_values().unwrap(), vec![json!(1), json!(2)]);
    }
}
