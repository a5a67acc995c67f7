//! CLI command handlers.

use anyhow::Result;
use pullpay_core::views::{Route, ViewOutcome};

pub mod auth;
pub mod churches;
pub mod config;
pub mod dashboard;
pub mod profile;
pub mod transactions;

/// Prints a view, or where the user has to go instead.
///
/// A redirect is navigation, not a failure. A failed view is an error.
fn render<T>(outcome: ViewOutcome<T>, show: impl FnOnce(T)) -> Result<()> {
    match outcome {
        ViewOutcome::Ready(data) => {
            show(data);
            Ok(())
        }
        ViewOutcome::Redirect(route) => {
            print_redirect(route);
            Ok(())
        }
        ViewOutcome::Failed(message) => anyhow::bail!("{message}"),
    }
}

fn print_redirect(route: Route) {
    match route {
        Route::Login => {
            println!("Not logged in. Run `pullpay login` to continue.");
        }
        other => println!("→ {other}"),
    }
}
