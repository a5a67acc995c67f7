//! Login, registration and logout.

use std::fmt;

use serde::Deserialize;
use tracing::{debug, info};

use crate::api::{ApiClient, FetchError, Method, decode_value, encode_body, paths};
use crate::models::{Credentials, Registration};
use crate::session::Session;
use crate::validation::{ValidationError, validate_credentials, validate_registration};
use crate::views::Route;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials. Please try again.";
pub const REGISTRATION_FAILED_MESSAGE: &str =
    "There was an error during registration or login. Please try again.";
const MISSING_TOKEN_MESSAGE: &str = "Login failed. Please check your credentials and try again.";

/// Login answer. JWT deployments send `access`/`refresh`, the opaque-token
/// deployment sends `token`.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
    #[serde(default)]
    token: Option<String>,
}

impl LoginResponse {
    fn into_session(self) -> Option<Session> {
        let non_blank = |t: &String| !t.trim().is_empty();
        match (self.access.filter(non_blank), self.token.filter(non_blank)) {
            (Some(access), _) => Some(Session::new(access, self.refresh)),
            (None, Some(token)) => Some(Session::new(token, None)),
            (None, None) => None,
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    Invalid(ValidationError),
    Fetch(FetchError),
    /// The server accepted the login but returned no token.
    MissingToken,
    /// The session could not be written to or removed from disk.
    Storage(String),
}

impl AuthError {
    /// Text to show the user. `fallback` is used for server errors that
    /// carry no message of their own.
    pub fn user_message_or(&self, fallback: &str) -> String {
        match self {
            AuthError::Invalid(err) => err.to_string(),
            AuthError::Fetch(err) => err.user_message_or(fallback),
            AuthError::MissingToken => MISSING_TOKEN_MESSAGE.to_string(),
            AuthError::Storage(details) => format!("Failed to save session: {details}"),
        }
    }
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::Invalid(err) => write!(f, "{err}"),
            AuthError::Fetch(err) => write!(f, "{err}"),
            AuthError::MissingToken => write!(f, "Login response contained no token"),
            AuthError::Storage(details) => write!(f, "Session storage failed: {details}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AuthError::Invalid(err) => Some(err),
            AuthError::Fetch(err) => Some(err),
            AuthError::MissingToken | AuthError::Storage(_) => None,
        }
    }
}

impl From<ValidationError> for AuthError {
    fn from(err: ValidationError) -> Self {
        AuthError::Invalid(err)
    }
}

impl From<FetchError> for AuthError {
    fn from(err: FetchError) -> Self {
        AuthError::Fetch(err)
    }
}

fn storage_error(err: &anyhow::Error) -> AuthError {
    AuthError::Storage(format!("{err:#}"))
}

/// Session lifecycle against the backend.
#[derive(Debug, Clone)]
pub struct Auth {
    client: ApiClient,
}

impl Auth {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Whether an access token is present.
    pub fn is_authenticated(&self) -> bool {
        self.client.tokens().is_authenticated()
    }

    /// Exchanges credentials for a session and stores it.
    ///
    /// # Errors
    /// Fails on invalid input, a rejected login, a response without a
    /// token, or when the session cannot be persisted.
    pub async fn login(&self, credentials: &Credentials) -> Result<Route, AuthError> {
        validate_credentials(credentials)?;

        let body = encode_body(credentials)?;
        let value = self
            .client
            .request_public(Method::POST, paths::LOGIN, Some(&body))
            .await?;
        let response: LoginResponse = decode_value(value)?;
        let session = response.into_session().ok_or(AuthError::MissingToken)?;

        self.client
            .tokens()
            .set(session)
            .map_err(|e| storage_error(&e))?;
        info!("logged in");
        Ok(Route::Dashboard)
    }

    /// Creates an account. Any 2xx counts as success.
    ///
    /// # Errors
    /// Fails on invalid input or when the server rejects the registration.
    pub async fn register(&self, registration: &Registration) -> Result<(), AuthError> {
        validate_registration(registration)?;

        let body = encode_body(registration)?;
        self.client
            .request_public(Method::POST, paths::REGISTER, Some(&body))
            .await?;
        debug!("account registered");
        Ok(())
    }

    /// Registers, then logs in with the same email and password.
    ///
    /// # Errors
    /// Fails with the first failing step.
    pub async fn register_and_login(
        &self,
        registration: &Registration,
    ) -> Result<Route, AuthError> {
        self.register(registration).await?;
        self.login(&registration.credentials()).await
    }

    /// Drops the session.
    ///
    /// # Errors
    /// Fails if the session file cannot be removed. The in-memory session
    /// is gone either way.
    pub fn logout(&self) -> Result<Route, AuthError> {
        self.client
            .tokens()
            .clear()
            .map_err(|e| storage_error(&e))?;
        info!("logged out");
        Ok(Route::Login)
    }
}
