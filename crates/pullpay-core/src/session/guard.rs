use tracing::debug;

use super::TokenStore;
use crate::api::{FetchError, FetchResult};
use crate::views::{Route, ViewOutcome};

/// Result of checking the session on view entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Proceed,
    Redirect(Route),
}

/// Gates authenticated views on the presence of an access token.
///
/// The guard only reads the store. The fetcher is what clears it on 401,
/// so by the time [`SessionGuard::on_result`] sees `Unauthenticated` the
/// session is already gone.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    tokens: TokenStore,
}

impl SessionGuard {
    pub fn new(tokens: TokenStore) -> Self {
        Self { tokens }
    }

    /// Decides whether a view may start fetching.
    pub fn enter(&self) -> GuardDecision {
        if self.tokens.is_authenticated() {
            GuardDecision::Proceed
        } else {
            debug!("no session, redirecting to {}", Route::Login);
            GuardDecision::Redirect(Route::Login)
        }
    }

    /// Maps a fetch outcome into a view outcome, turning an expired session
    /// into a redirect to login.
    pub fn on_result<T>(&self, result: FetchResult<T>) -> ViewOutcome<T> {
        match result {
            Ok(data) => ViewOutcome::Ready(data),
            Err(err) => self.on_error(&err),
        }
    }

    pub fn on_error<T>(&self, err: &FetchError) -> ViewOutcome<T> {
        if err.is_unauthenticated() {
            debug!("session rejected, redirecting to {}", Route::Login);
            ViewOutcome::Redirect(Route::Login)
        } else {
            ViewOutcome::Failed(err.user_message())
        }
    }
}
