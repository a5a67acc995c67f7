//! Transaction command handlers.

use anyhow::Result;
use pullpay_core::api::SESSION_EXPIRED_MESSAGE;
use pullpay_core::models::Transaction;
use pullpay_core::mutation::MutationStrategy;
use pullpay_core::validation::parse_new_transaction;
use pullpay_core::views::{Dashboard, Route, TransactionsView, ViewOutcome};

use super::{print_redirect, render};

pub async fn list(dashboard: &Dashboard, page: usize) -> Result<()> {
    render(dashboard.load_transactions(page).await, |view| {
        print_transactions(&view);
    })
}

pub async fn create(dashboard: &Dashboard, amount: &str, church_id: u64) -> Result<()> {
    let payload = parse_new_transaction(amount, Some(church_id))?;

    let view = match dashboard.load_transactions(1).await {
        ViewOutcome::Ready(view) => view,
        ViewOutcome::Redirect(route) => {
            print_redirect(route);
            return Ok(());
        }
        ViewOutcome::Failed(message) => anyhow::bail!("{message}"),
    };

    if !view.churches.iter().any(|church| church.id == church_id) {
        anyhow::bail!(
            "Church {church_id} not found. \
             Run `pullpay churches list` to see the available churches."
        );
    }

    let submitter = dashboard.transaction_submitter(&view);

    match submitter.submit(payload).await {
        Ok(created) => {
            println!("✓ Transaction created");
            let page = view.page();
            let confirmed = page
                .items
                .iter()
                .find(|tx| tx.id == created.id)
                .unwrap_or(&created);
            print_transaction(confirmed);
            println!(
                "Total donated: ${} across {} transactions",
                view.total_amount(),
                view.count()
            );
            Ok(())
        }
        Err(err) if err.is_unauthenticated() => {
            println!("{SESSION_EXPIRED_MESSAGE}");
            print_redirect(Route::Login);
            Ok(())
        }
        Err(err) => anyhow::bail!(
            "{}",
            err.user_message_or(submitter.strategy().fallback_message())
        ),
    }
}

fn print_transactions(view: &TransactionsView) {
    let count = view.count();
    if count == 0 {
        println!("No transactions yet.");
        return;
    }

    println!(
        "Total donated: ${} across {count} transactions",
        view.total_amount()
    );
    let page = view.page();
    println!("Page {} of {}", page.page_number, page.total_pages);
    println!();
    for tx in &page.items {
        print_transaction(tx);
    }
}

fn print_transaction(tx: &Transaction) {
    let submitter = tx.submitter_name();
    let by = if submitter.is_empty() {
        String::new()
    } else {
        format!("  ({submitter})")
    };
    println!(
        "  #{:<6} {}  ${:>10}  {}{by}",
        tx.id,
        tx.date.format("%Y-%m-%d"),
        tx.amount.to_string(),
        tx.church_label(),
    );
}
