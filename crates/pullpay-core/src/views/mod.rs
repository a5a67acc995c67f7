//! View state: routes, remote resources and per-view outcomes.

mod controller;
mod loader;
mod pagination;

use std::fmt;

pub use controller::{Dashboard, TransactionsView};
pub use loader::{FetchSpec, LoadedView, ViewDataLoader};
pub use pagination::{Page, paginate};

use crate::api::FetchError;

/// Navigable dashboard locations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    Dashboard,
    Profile,
    Transactions,
    Churches,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Dashboard => "/dashboard",
            Route::Profile => "/dashboard/profile",
            Route::Transactions => "/dashboard/transactions",
            Route::Churches => "/dashboard/churches",
        }
    }

    /// Whether entering this route needs a session.
    pub fn requires_session(self) -> bool {
        !matches!(self, Route::Login | Route::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Loading,
    Ready,
    Failed,
}

/// Server data together with its loading status.
///
/// Data is only reachable once the resource is ready.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteResource<T> {
    status: ResourceStatus,
    data: Option<T>,
    error: Option<String>,
}

impl<T> RemoteResource<T> {
    pub fn loading() -> Self {
        Self {
            status: ResourceStatus::Loading,
            data: None,
            error: None,
        }
    }

    pub fn ready(data: T) -> Self {
        Self {
            status: ResourceStatus::Ready,
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: ResourceStatus::Failed,
            data: None,
            error: Some(error.into()),
        }
    }

    pub fn from_result(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(data) => Self::ready(data),
            Err(err) => Self::failed(err.user_message()),
        }
    }

    pub fn status(&self) -> ResourceStatus {
        self.status
    }

    pub fn is_ready(&self) -> bool {
        self.status == ResourceStatus::Ready
    }

    pub fn data(&self) -> Option<&T> {
        match self.status {
            ResourceStatus::Ready => self.data.as_ref(),
            ResourceStatus::Loading | ResourceStatus::Failed => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self.status {
            ResourceStatus::Ready => self.data,
            ResourceStatus::Loading | ResourceStatus::Failed => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> RemoteResource<U> {
        RemoteResource {
            status: self.status,
            data: self.data.map(f),
            error: self.error,
        }
    }
}

impl<T> Default for RemoteResource<T> {
    fn default() -> Self {
        Self::loading()
    }
}

/// What a view produces once its data has been requested.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewOutcome<T> {
    /// Leave the view; nothing is rendered.
    Redirect(Route),
    /// Render the error message in place of the view.
    Failed(String),
    Ready(T),
}

impl<T> ViewOutcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            ViewOutcome::Ready(data) => Some(data),
            ViewOutcome::Redirect(_) | ViewOutcome::Failed(_) => None,
        }
    }

    pub fn redirect(&self) -> Option<Route> {
        match self {
            ViewOutcome::Redirect(route) => Some(*route),
            ViewOutcome::Failed(_) | ViewOutcome::Ready(_) => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ViewOutcome<U> {
        match self {
            ViewOutcome::Redirect(route) => ViewOutcome::Redirect(route),
            ViewOutcome::Failed(message) => ViewOutcome::Failed(message),
            ViewOutcome::Ready(data) => ViewOutcome::Ready(f(data)),
        }
    }
}
