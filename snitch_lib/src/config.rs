//! Client options and API key resolution.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Base URL for the Dead Man's Snitch REST API.
pub const API_BASE_URL: &str = "https://api.deadmanssnitch.com";
/// Base URL for Dead Man's Snitch check-ins.
pub const CHECK_IN_BASE_URL: &str = "https://nosnch.in";
/// Environment variable consulted when no API key is configured explicitly.
pub const API_KEY_ENV: &str = "DMS_API_KEY";

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 10_000;
pub const DEFAULT_API_VERSION: u32 = 1;

/// Options accepted by [`crate::Client::new`].
///
/// Deserializes from the camelCase mapping `{"apiKey", "timeout", "apiBaseUrl",
/// "checkInBaseUrl", "fullResponse", "maxContentLength", "apiVersion"}`.
/// Zero values for `timeout` and `maxContentLength` mean "use the default".
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientConfig {
    pub api_key: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout: u64,
    pub api_base_url: String,
    pub check_in_base_url: String,
    /// Return `{statusCode, statusMessage, headers, data}` instead of bare data.
    pub full_response: bool,
    /// Maximum response body size in bytes.
    pub max_content_length: usize,
    pub api_version: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            timeout: DEFAULT_TIMEOUT_MS,
            api_base_url: API_BASE_URL.to_string(),
            check_in_base_url: CHECK_IN_BASE_URL.to_string(),
            full_response: false,
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
            api_version: DEFAULT_API_VERSION,
        }
    }
}

// The API key is a secret; keep it out of debug output and logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("api_base_url", &self.api_base_url)
            .field("check_in_base_url", &self.check_in_base_url)
            .field("full_response", &self.full_response)
            .field("max_content_length", &self.max_content_length)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl ClientConfig {
    /// Build options from an untyped mapping, as read from a JSON config file.
    ///
    /// `Null` is treated as "no options". Arrays, strings, numbers and booleans
    /// are rejected. The API key is resolved from the mapping first, then from
    /// `DMS_API_KEY`.
    pub fn from_options(options: Value) -> Result<Self, Error> {
        let options = match options {
            Value::Null => Value::Object(Default::default()),
            Value::Object(_) => options,
            _ => {
                return Err(Error::InvalidOptions(
                    "The client options must be an object".to_string(),
                ))
            }
        };
        let mut config: ClientConfig = serde_json::from_value(options)
            .map_err(|e| Error::InvalidOptions(format!("Invalid client options: {}", e)))?;
        config.api_key = resolve_api_key(config.api_key.as_deref(), env_api_key().as_deref());
        Ok(config.with_defaults())
    }

    /// Default options with the API key taken from `DMS_API_KEY`.
    pub fn from_env() -> Self {
        Self {
            api_key: resolve_api_key(None, env_api_key().as_deref()),
            ..Self::default()
        }
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Replace zero values with defaults and trim the API key.
    pub(crate) fn with_defaults(mut self) -> Self {
        if self.timeout == 0 {
            self.timeout = DEFAULT_TIMEOUT_MS;
        }
        if self.max_content_length == 0 {
            self.max_content_length = DEFAULT_MAX_CONTENT_LENGTH;
        }
        if self.api_version == 0 {
            self.api_version = DEFAULT_API_VERSION;
        }
        self.api_key = resolve_api_key(self.api_key.as_deref(), None);
        self
    }
}

/// Pick the API key: explicit value first, then the environment value.
///
/// The chosen value is trimmed; a blank result counts as no key.
pub fn resolve_api_key(explicit: Option<&str>, env: Option<&str>) -> Option<String> {
    explicit
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .or_else(|| env.map(str::trim).filter(|k| !k.is_empty()))
        .map(String::from)
}

fn env_api_key() -> Option<String> {
    std::env::var(API_KEY_ENV).ok()
}
