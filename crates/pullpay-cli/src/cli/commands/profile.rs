//! Profile command handlers.

use anyhow::Result;
use pullpay_core::api::SESSION_EXPIRED_MESSAGE;
use pullpay_core::models::{ProfileUpdate, UserProfile};
use pullpay_core::mutation::{MutationStrategy, shared};
use pullpay_core::validation::validate_profile_update;
use pullpay_core::views::{Dashboard, Route, ViewOutcome};

use super::{print_redirect, render};

pub async fn show(dashboard: &Dashboard) -> Result<()> {
    render(dashboard.load_profile().await, |user| print_profile(&user))
}

pub async fn update(dashboard: &Dashboard, update: ProfileUpdate) -> Result<()> {
    validate_profile_update(&update)?;

    let current = match dashboard.load_profile().await {
        ViewOutcome::Ready(user) => user,
        ViewOutcome::Redirect(route) => {
            print_redirect(route);
            return Ok(());
        }
        ViewOutcome::Failed(message) => anyhow::bail!("{message}"),
    };

    let submitter = dashboard.profile_submitter(shared(Some(current)));
    match submitter.submit(update).await {
        Ok(updated) => {
            println!("✓ Profile updated");
            print_profile(&updated);
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

fn print_profile(user: &UserProfile) {
    println!("First name: {}", user.first_name);
    println!("Last name:  {}", user.last_name);
    println!("Email:      {}", user.email);
}
