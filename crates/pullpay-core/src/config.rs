//! Configuration management for PullPay.
//!
//! Loads configuration from ${PULLPAY_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Authorization header scheme used for authenticated requests.
///
/// The backend has been deployed with JWT access tokens (`Bearer`) and with
/// opaque DRF tokens (`Token`). Which one applies is a deployment choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    #[default]
    Bearer,
    Token,
}

impl AuthScheme {
    /// Returns the prefix placed before the credential in the header value.
    pub fn header_prefix(self) -> &'static str {
        match self {
            AuthScheme::Bearer => "Bearer",
            AuthScheme::Token => "Token",
        }
    }

    /// Formats a full `Authorization` header value for `token`.
    pub fn header_value(self, token: &str) -> String {
        format!("{} {token}", self.header_prefix())
    }

    pub fn display_name(self) -> &'static str {
        match self {
            AuthScheme::Bearer => "bearer",
            AuthScheme::Token => "token",
        }
    }
}

impl std::str::FromStr for AuthScheme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bearer" => Ok(Self::Bearer),
            "token" => Ok(Self::Token),
            other => Err(format!(
                "Unknown auth scheme: {other} (expected 'bearer' or 'token')"
            )),
        }
    }
}

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for PullPay configuration and session data.
    //!
    //! PULLPAY_HOME resolution order:
    //! 1. PULLPAY_HOME environment variable (if set)
    //! 2. ~/.config/pullpay (default)
    //! 3. ./.pullpay when no home directory can be determined

    use std::path::PathBuf;

    /// Returns the PullPay home directory.
    pub fn pullpay_home() -> PathBuf {
        if let Ok(home) = std::env::var("PULLPAY_HOME") {
            let trimmed = home.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".pullpay"),
            |h| h.join(".config").join("pullpay"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        pullpay_home().join("config.toml")
    }

    /// Returns the path to the persisted session file.
    pub fn session_path() -> PathBuf {
        pullpay_home().join("session.json")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root URL of the backend
    pub base_url: String,

    /// Authorization header scheme
    pub auth_scheme: AuthScheme,

    /// Transactions per page
    pub page_size: usize,

    /// Timeout per request in seconds (0 disables)
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            auth_scheme: AuthScheme::default(),
            page_size: Self::DEFAULT_PAGE_SIZE,
            request_timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
    pub const DEFAULT_PAGE_SIZE: usize = 9;
    const DEFAULT_TIMEOUT_SECS: u64 = 30;
    /// Keys accepted by [`Config::set_value_to`].
    pub const KEYS: &[&str] = &["base_url", "auth_scheme", "page_size", "request_timeout_secs"];

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Resolves the backend URL with precedence: env > config > default.
    ///
    /// # Errors
    /// Returns an error if the chosen URL is not a valid absolute URL.
    pub fn effective_base_url(&self) -> Result<url::Url> {
        if let Ok(env_url) = std::env::var("PULLPAY_BASE_URL") {
            let trimmed = env_url.trim();
            if !trimmed.is_empty() {
                return parse_base_url(trimmed);
            }
        }

        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            return parse_base_url(Self::DEFAULT_BASE_URL);
        }
        parse_base_url(trimmed)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        if self.request_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.request_timeout_secs))
        }
    }

    /// Page size with zero treated as one.
    pub fn effective_page_size(&self) -> usize {
        self.page_size.max(1)
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Updates a single key in the config file at `path`.
    ///
    /// Creates the file from the default template if it doesn't exist.
    /// Preserves existing fields and comments using `toml_edit`.
    ///
    /// # Errors
    /// Returns an error for unknown keys, invalid values, or I/O failures.
    pub fn set_value_to(path: &Path, key: &str, raw: &str) -> Result<()> {
        use toml_edit::{DocumentMut, value};

        let contents = if path.exists() {
            fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?
        } else {
            default_config_template().to_string()
        };

        let mut doc: DocumentMut = contents
            .parse()
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        match key {
            "base_url" => {
                let url = parse_base_url(raw.trim())?;
                doc[key] = value(url.as_str().trim_end_matches('/'));
            }
            "auth_scheme" => {
                let scheme: AuthScheme = raw.parse().map_err(anyhow::Error::msg)?;
                doc[key] = value(scheme.display_name());
            }
            "page_size" | "request_timeout_secs" => {
                let number: i64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("{key} must be a non-negative integer"))?;
                if number < 0 {
                    anyhow::bail!("{key} must be a non-negative integer");
                }
                doc[key] = value(number);
            }
            other => anyhow::bail!(
                "Unknown config key: {other} (expected one of: {})",
                Self::KEYS.join(", ")
            ),
        }

        Self::write_config(path, &doc.to_string())
    }

    fn write_config(path: &Path, contents: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}

fn parse_base_url(raw: &str) -> Result<url::Url> {
    let url = url::Url::parse(raw).with_context(|| format!("Invalid PullPay base URL: {raw}"))?;
    if url.cannot_be_a_base() {
        anyhow::bail!("Invalid PullPay base URL: {raw}");
    }
    Ok(url)
}
