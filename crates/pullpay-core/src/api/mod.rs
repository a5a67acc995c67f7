//! HTTP access to the PullPay backend.

mod client;
mod error;

pub use client::{ApiClient, ClientOptions, USER_AGENT};
pub(crate) use client::{decode_value, encode_body};
pub use error::{
    FetchError, FetchErrorKind, FetchResult, GENERIC_SERVER_MESSAGE, NETWORK_MESSAGE,
    SESSION_EXPIRED_MESSAGE, extract_server_message,
};
pub use reqwest::Method;

/// Backend endpoint paths.
pub mod paths {
    pub const LOGIN: &str = "/api/login/";
    pub const REGISTER: &str = "/api/register/";
    pub const CURRENT_USER: &str = "/api/user/";
    pub const UPDATE_USER: &str = "/user/";
    pub const TRANSACTIONS: &str = "/api/transactions/";
    pub const CREATE_TRANSACTION: &str = "/transactions/create/";
    pub const CHURCHES: &str = "/churches/";
}
