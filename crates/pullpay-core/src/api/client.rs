use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::{FetchError, FetchResult, classify_reqwest_error};
use crate::config::{AuthScheme, Config};
use crate::session::TokenStore;

/// Standard User-Agent header for PullPay API requests.
pub const USER_AGENT: &str = concat!("pullpay/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`ApiClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub auth_scheme: AuthScheme,
    pub timeout: Option<Duration>,
}

impl ClientOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            auth_scheme: AuthScheme::default(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = scheme;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds options from config, honouring `PULLPAY_BASE_URL`.
    ///
    /// # Errors
    /// Returns an error if the resolved base URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config.effective_base_url()?;
        Ok(Self {
            base_url: base_url.to_string(),
            auth_scheme: config.auth_scheme,
            timeout: config.request_timeout(),
        })
    }
}

/// HTTP client for the PullPay backend.
///
/// Authenticated calls read the access token from the shared [`TokenStore`]
/// on every request and clear it when the server answers 401. Nothing is
/// retried.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth_scheme: AuthScheme,
    tokens: TokenStore,
}

impl ApiClient {
    /// Creates a client.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(options: ClientOptions, tokens: TokenStore) -> Result<Self> {
        let parsed = url::Url::parse(options.base_url.trim())
            .with_context(|| format!("Invalid PullPay base URL: {}", options.base_url))?;

        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: parsed.as_str().trim_end_matches('/').to_string(),
            auth_scheme: options.auth_scheme,
            tokens,
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn auth_scheme(&self) -> AuthScheme {
        self.auth_scheme
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the absolute URL for an API path.
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    /// Sends an authenticated request and returns the JSON body.
    ///
    /// Without an access token this fails with `Unauthenticated` and sends
    /// nothing. A 401 answer clears the session.
    ///
    /// # Errors
    /// Returns the classified [`FetchError`] for any non-2xx outcome.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> FetchResult<Value> {
        let Some(token) = self.tokens.access_token() else {
            debug!(%method, path, "no session, request skipped");
            return Err(FetchError::Unauthenticated);
        };

        let builder = self
            .http
            .request(method.clone(), self.endpoint(path))
            .header(AUTHORIZATION, self.auth_scheme.header_value(&token));

        let response = self.execute(&method, path, builder, body).await?;
        // The body of a 401 is never read; the session goes either way.
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            info!(%method, path, "session rejected by server, clearing tokens");
            if let Err(err) = self.tokens.clear() {
                warn!("failed to remove persisted session: {err:#}");
            }
            return Err(FetchError::Unauthenticated);
        }
        read_body(response).await
    }

    /// Sends a request without credentials (login, registration).
    ///
    /// Never reads or clears the session, so a 401 here is an ordinary
    /// server error.
    ///
    /// # Errors
    /// Returns the classified [`FetchError`] for any non-2xx outcome.
    pub async fn request_public(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> FetchResult<Value> {
        let builder = self.http.request(method.clone(), self.endpoint(path));
        let response = self.execute(&method, path, builder, body).await?;
        read_body(response).await
    }

    /// Authenticated request decoded into `T`.
    ///
    /// # Errors
    /// Returns `InvalidResponse` if the body does not decode into `T`, or
    /// the classified [`FetchError`] of the request.
    pub async fn request_json<T, B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> FetchResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = body.map(encode_body).transpose()?;
        let value = self.request(method, path, body.as_ref()).await?;
        decode_value(value)
    }

    /// Authenticated GET decoded into `T`.
    ///
    /// # Errors
    /// See [`ApiClient::request_json`].
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> FetchResult<T> {
        self.request_json::<T, Value>(Method::GET, path, None).await
    }

    async fn execute(
        &self,
        method: &Method,
        path: &str,
        builder: RequestBuilder,
        body: Option<&Value>,
    ) -> FetchResult<reqwest::Response> {
        let builder = builder.header(ACCEPT, "application/json");
        let builder = match body {
            Some(body) => builder.json(body),
            None => builder,
        };

        let response = builder.send().await.map_err(|e| {
            debug!(%method, path, "request failed: {e}");
            classify_reqwest_error(&e)
        })?;

        debug!(%method, path, status = response.status().as_u16(), "response received");
        Ok(response)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("auth_scheme", &self.auth_scheme)
            .finish_non_exhaustive()
    }
}

async fn read_body(response: reqwest::Response) -> FetchResult<Value> {
    let status = response.status();
    match response.text().await {
        Ok(text) => classify_response(status, &text),
        Err(e) if status.is_success() => Err(classify_reqwest_error(&e)),
        // A broken error body still reports the status.
        Err(_) => Err(FetchError::ServerError {
            status: status.as_u16(),
            message: None,
        }),
    }
}

fn classify_response(status: reqwest::StatusCode, text: &str) -> FetchResult<Value> {
    if !status.is_success() {
        return Err(FetchError::from_status(status.as_u16(), text));
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|e| FetchError::InvalidResponse(e.to_string()))
}

pub(crate) fn encode_body<B: Serialize + ?Sized>(body: &B) -> FetchResult<Value> {
    serde_json::to_value(body)
        .map_err(|e| FetchError::InvalidResponse(format!("Failed to encode request body: {e}")))
}

pub(crate) fn decode_value<T: DeserializeOwned>(value: Value) -> FetchResult<T> {
    serde_json::from_value(value).map_err(|e| FetchError::InvalidResponse(e.to_string()))
}
