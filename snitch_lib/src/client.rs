//! HTTP client for Dead Man's Snitch check-ins and the REST API.

use crate::config::ClientConfig;
use crate::error::{normalize, Error, ErrorResponse, TransportError};
use crate::request::{encode_segment, RequestKind, RequestOptions};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client as HttpClient, Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

const USER_AGENT_STRING: &str = concat!("DeadMansSnitch-Client/", env!("CARGO_PKG_VERSION"));

/// Status values for snitches.
pub const SNITCH_STATUSES: [&str; 5] = ["pending", "healthy", "failed", "errored", "paused"];
/// Interval values for snitches.
pub const SNITCH_INTERVALS: [&str; 6] = [
    "15_minute",
    "30_minute",
    "hourly",
    "daily",
    "weekly",
    "monthly",
];
/// Alert type values for snitches.
pub const SNITCH_ALERT_TYPES: [&str; 2] = ["basic", "smart"];

/// Response envelope returned when `full_response` is enabled.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullResponse {
    pub status_code: u16,
    pub status_message: String,
    pub headers: BTreeMap<String, String>,
    pub data: Value,
}

/// Result of a successful call: the bare payload, or the full envelope.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Data(Value),
    Full(FullResponse),
}

impl Reply {
    /// The response payload, whichever shape was requested.
    pub fn data(&self) -> &Value {
        match self {
            Reply::Data(v) => v,
            Reply::Full(full) => &full.data,
        }
    }

    pub fn into_data(self) -> Value {
        match self {
            Reply::Data(v) => v,
            Reply::Full(full) => full.data,
        }
    }

    fn try_map_data<F>(self, f: F) -> Result<Self, Error>
    where
        F: FnOnce(Value) -> Result<Value, Error>,
    {
        Ok(match self {
            Reply::Data(v) => Reply::Data(f(v)?),
            Reply::Full(mut full) => {
                full.data = f(full.data)?;
                Reply::Full(full)
            }
        })
    }
}

/// Successful transport response before shaping.
struct RawResponse {
    status: StatusCode,
    headers: BTreeMap<String, String>,
    data: Value,
}

/// A pre-configured HTTP sender bound to one base URL.
#[derive(Clone)]
struct Sender {
    kind: RequestKind,
    base_url: String,
    api_key: Option<String>,
    max_content_length: usize,
    http: HttpClient,
}

impl Sender {
    /// Build the sender for `kind`, or `None` when no headers apply
    /// (an API sender without an API key).
    fn build(
        kind: RequestKind,
        base_url: &str,
        api_key: Option<&str>,
        config: &ClientConfig,
    ) -> Result<Option<Self>, Error> {
        let Some(headers) = request_headers(kind, api_key.is_some()) else {
            return Ok(None);
        };
        Url::parse(base_url).map_err(|e| {
            Error::InvalidOptions(format!("Invalid {} base URL '{}': {}", kind, base_url, e))
        })?;
        let http = HttpClient::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.timeout))
            .build()
            .map_err(|e| Error::InvalidOptions(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Some(Self {
            kind,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: match kind {
                RequestKind::Api => api_key.map(String::from),
                RequestKind::CheckIn => None,
            },
            max_content_length: config.max_content_length,
            http,
        }))
    }

    async fn send(&self, options: &RequestOptions) -> Result<RawResponse, TransportError> {
        let url = format!("{}{}", self.base_url, options.path_and_query());
        let mut req = self.http.request(options.method.clone(), &url);
        if let Some(ref key) = self.api_key {
            req = req.basic_auth(key, Some(""));
        }
        if let Some(ref body) = options.body {
            let bytes = serde_json::to_vec(body).map_err(|e| {
                TransportError {
                    message: e.to_string(),
                    has_request: false,
                    response: None,
                    source: None,
                }
                .with_source(e)
            })?;
            req = req.body(bytes);
        }

        let res = req.send().await.map_err(from_reqwest)?;
        let status = res.status();
        let headers = header_map(res.headers());
        let body = read_body(res, self.max_content_length).await?;
        let data = self.parse_body(&body);

        if !status.is_success() {
            return Err(TransportError::with_response(
                format!("Request failed with status code {}", status.as_u16()),
                ErrorResponse {
                    status: status.as_u16(),
                    status_text: status.canonical_reason().map(String::from),
                    headers,
                    body: data,
                },
            ));
        }
        Ok(RawResponse {
            status,
            headers,
            data,
        })
    }

    /// Check-in bodies are plain text; API bodies are JSON, falling back to
    /// the raw text when the body is empty or not JSON.
    fn parse_body(&self, body: &[u8]) -> Value {
        let text = String::from_utf8_lossy(body).into_owned();
        match self.kind {
            RequestKind::CheckIn => Value::String(text),
            RequestKind::Api => serde_json::from_str(&text).unwrap_or(Value::String(text)),
        }
    }
}

fn request_headers(kind: RequestKind, has_api_key: bool) -> Option<HeaderMap> {
    let content_type = match kind {
        RequestKind::CheckIn => "text/plain; charset=utf-8",
        RequestKind::Api if has_api_key => "application/json; charset=utf-8",
        RequestKind::Api => return None,
    };
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(content_type));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_STRING));
    Some(headers)
}

fn from_reqwest(e: reqwest::Error) -> TransportError {
    TransportError {
        message: e.to_string(),
        has_request: !e.is_builder(),
        response: None,
        source: None,
    }
    .with_source(e)
}

fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut out: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        match out.get_mut(name.as_str()) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => {
                out.insert(name.as_str().to_string(), value);
            }
        }
    }
    out
}

/// Read the body, failing once it grows past `limit` bytes.
async fn read_body(mut res: reqwest::Response, limit: usize) -> Result<Vec<u8>, TransportError> {
    let too_large = || {
        TransportError::no_response(format!("maxContentLength size of {} exceeded", limit))
    };
    if res.content_length().is_some_and(|len| len > limit as u64) {
        return Err(too_large());
    }
    let mut body = Vec::new();
    while let Some(chunk) = res.chunk().await.map_err(from_reqwest)? {
        if body.len() + chunk.len() > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Dead Man's Snitch client.
///
/// Holds two senders: one for check-ins (no credentials) and one for the
/// management API (basic auth with the API key as username). The API sender
/// only exists when an API key is configured.
#[derive(Clone)]
pub struct Client {
    config: ClientConfig,
    check_in_sender: Option<Sender>,
    api_sender: Option<Sender>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("check_in", &self.check_in_sender.is_some())
            .field("api", &self.api_sender.is_some())
            .finish()
    }
}

impl Client {
    /// Create a client from resolved options.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let config = config.with_defaults();
        let check_in_sender = Sender::build(
            RequestKind::CheckIn,
            &config.check_in_base_url,
            None,
            &config,
        )?;
        let api_sender = Sender::build(
            RequestKind::Api,
            &config.api_base_url,
            config.api_key.as_deref(),
            &config,
        )?;
        tracing::debug!(
            api_base_url = %config.api_base_url,
            check_in_base_url = %config.check_in_base_url,
            has_api_key = config.api_key.is_some(),
            "created snitch client"
        );
        Ok(Self {
            config,
            check_in_sender,
            api_sender,
        })
    }

    /// Create a client from an untyped options mapping (see [`ClientConfig::from_options`]).
    pub fn from_options(options: Value) -> Result<Self, Error> {
        Self::new(ClientConfig::from_options(options)?)
    }

    /// Create a client with default options and the API key from `DMS_API_KEY`.
    pub fn from_env() -> Result<Self, Error> {
        Self::new(ClientConfig::from_env())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Switch between bare payloads and full response envelopes.
    pub fn set_full_response(&mut self, full_response: bool) {
        self.config.full_response = full_response;
    }

    /// Replace (or clear) the API key and rebuild the API sender to match.
    pub fn set_api_key(&mut self, api_key: Option<String>) -> Result<(), Error> {
        let api_key = crate::config::resolve_api_key(api_key.as_deref(), None);
        self.api_sender = Sender::build(
            RequestKind::Api,
            &self.config.api_base_url,
            api_key.as_deref(),
            &self.config,
        )?;
        self.config.api_key = api_key;
        Ok(())
    }

    fn check_api_key(&self) -> Result<(), Error> {
        if self.config.api_key.is_none() {
            return Err(Error::MissingApiKey);
        }
        Ok(())
    }

    fn snitches_path(&self) -> String {
        format!("/v{}/snitches", self.config.api_version)
    }

    fn snitch_path(&self, token: &str) -> String {
        format!("{}/{}", self.snitches_path(), encode_segment(token))
    }

    /// Dispatch a request through the sender for `kind` and shape the result.
    pub async fn perform_request(
        &self,
        kind: RequestKind,
        options: &RequestOptions,
    ) -> Result<Reply, Error> {
        if options.is_empty() {
            return Err(Error::InvalidRequest(
                "A request options object must be provided".to_string(),
            ));
        }
        let sender = match kind {
            RequestKind::CheckIn => self.check_in_sender.as_ref(),
            RequestKind::Api => self.api_sender.as_ref(),
        }
        .ok_or_else(|| {
            Error::Misconfigured(format!(
                "No sender is configured for '{}' requests (is an API key set?)",
                kind
            ))
        })?;

        tracing::debug!(%kind, method = %options.method, path = %options.path, "sending request");
        let raw = match sender.send(options).await {
            Ok(raw) => raw,
            Err(err) => {
                let err = normalize(err);
                tracing::debug!(%kind, path = %options.path, error = %err, "request failed");
                return Err(err);
            }
        };
        tracing::debug!(%kind, status = raw.status.as_u16(), "request succeeded");
        Ok(self.shape(raw))
    }

    fn shape(&self, raw: RawResponse) -> Reply {
        if !self.config.full_response {
            return Reply::Data(raw.data);
        }
        // The static table wins; reqwest's canonical reason covers codes it lacks.
        let status_message = crate::status::reason_phrase(raw.status.as_u16())
            .or_else(|| raw.status.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Reply::Full(FullResponse {
            status_code: raw.status.as_u16(),
            status_message,
            headers: raw.headers,
            data: raw.data,
        })
    }

    /// Check in a snitch.
    ///
    /// A string message is sent as-is in `m`; objects and arrays are
    /// JSON-encoded first. Other values (and empty strings) are ignored.
    /// No API key is needed.
    pub async fn check_in(&self, token: &str, message: Option<&Value>) -> Result<Reply, Error> {
        let mut params = BTreeMap::new();
        match message {
            Some(Value::String(m)) if !m.is_empty() => {
                params.insert("m".to_string(), m.clone());
            }
            Some(m @ (Value::Object(_) | Value::Array(_))) => {
                params.insert("m".to_string(), m.to_string());
            }
            _ => {}
        }
        let options = RequestOptions::new(
            Method::GET,
            format!("/{}", encode_segment(token)),
            Some(params),
            None,
        );
        self.perform_request(RequestKind::CheckIn, &options).await
    }

    /// List snitches, optionally restricted to those carrying all `tags`.
    pub async fn get_snitches(&self, tags: &[String]) -> Result<Reply, Error> {
        self.check_api_key()?;
        let query = match tags {
            [] => None,
            [tag] => Some(BTreeMap::from([("tags".to_string(), tag.clone())])),
            _ => Some(BTreeMap::from([("tags".to_string(), tags.join(","))])),
        };
        let options = RequestOptions::new(Method::GET, self.snitches_path(), query, None);
        self.perform_request(RequestKind::Api, &options).await
    }

    /// Snitches whose `status` equals `status`.
    pub async fn filter_by_status(&self, status: &str) -> Result<Reply, Error> {
        self.check_api_key()?;
        validate_choice(status, "status", "status", &SNITCH_STATUSES)?;
        self.filter_snitches("status", status).await
    }

    /// Snitches whose `interval` equals `interval`.
    pub async fn filter_by_interval(&self, interval: &str) -> Result<Reply, Error> {
        self.check_api_key()?;
        validate_choice(interval, "interval", "interval", &SNITCH_INTERVALS)?;
        self.filter_snitches("interval", interval).await
    }

    /// Snitches whose `alert_type` equals `alert_type`.
    pub async fn filter_by_alert_type(&self, alert_type: &str) -> Result<Reply, Error> {
        self.check_api_key()?;
        validate_choice(alert_type, "alert_type", "alert type", &SNITCH_ALERT_TYPES)?;
        self.filter_snitches("alert_type", alert_type).await
    }

    async fn filter_snitches(&self, field: &str, value: &str) -> Result<Reply, Error> {
        let reply = self.get_snitches(&[]).await?;
        reply.try_map_data(|data| match data {
            Value::Array(snitches) => Ok(Value::Array(
                snitches
                    .into_iter()
                    .filter(|s| s.get(field).and_then(Value::as_str) == Some(value))
                    .collect(),
            )),
            _ => Err(Error::UnexpectedResponse(
                "Expected a list of snitches from the API".to_string(),
            )),
        })
    }

    /// Get a single snitch.
    pub async fn get_snitch(&self, token: &str) -> Result<Reply, Error> {
        self.check_api_key()?;
        let options = RequestOptions::new(Method::GET, self.snitch_path(token), None, None);
        self.perform_request(RequestKind::Api, &options).await
    }

    /// Create a snitch from `info` (name, interval, alert_type, tags, notes, ...).
    pub async fn create_snitch(&self, info: Option<&Value>) -> Result<Reply, Error> {
        self.check_api_key()?;
        let options = RequestOptions::new(Method::POST, self.snitches_path(), None, info);
        self.perform_request(RequestKind::Api, &options).await
    }

    /// Update the fields of a snitch present in `info`.
    pub async fn update_snitch(&self, token: &str, info: Option<&Value>) -> Result<Reply, Error> {
        self.check_api_key()?;
        let options = RequestOptions::new(Method::PATCH, self.snitch_path(token), None, info);
        self.perform_request(RequestKind::Api, &options).await
    }

    /// Add tags to a snitch. Returns the snitch's current tags.
    pub async fn add_tags(&self, token: &str, tags: &[String]) -> Result<Reply, Error> {
        self.check_api_key()?;
        let body = json!(tags);
        let options = RequestOptions::new(
            Method::POST,
            format!("{}/tags", self.snitch_path(token)),
            None,
            Some(&body),
        );
        self.perform_request(RequestKind::Api, &options).await
    }

    /// Remove one tag from a snitch. Returns the snitch's current tags.
    pub async fn remove_tag(&self, token: &str, tag: &str) -> Result<Reply, Error> {
        self.check_api_key()?;
        let options = RequestOptions::new(
            Method::DELETE,
            format!("{}/tags/{}", self.snitch_path(token), encode_segment(tag)),
            None,
            None,
        );
        self.perform_request(RequestKind::Api, &options).await
    }

    /// Replace all tags of a snitch. At least one tag is required.
    pub async fn change_tags(&self, token: &str, tags: &[String]) -> Result<Reply, Error> {
        self.check_api_key()?;
        if tags.is_empty() {
            return Err(Error::InvalidArgument(
                "At least one tag must be provided".to_string(),
            ));
        }
        self.update_snitch(token, Some(&json!({ "tags": tags }))).await
    }

    /// Remove every tag from a snitch.
    pub async fn remove_all_tags(&self, token: &str) -> Result<Reply, Error> {
        self.check_api_key()?;
        self.update_snitch(token, Some(&json!({ "tags": [] }))).await
    }

    /// Pause an active snitch.
    pub async fn pause_snitch(&self, token: &str) -> Result<Reply, Error> {
        self.check_api_key()?;
        let options = RequestOptions::new(
            Method::POST,
            format!("{}/pause", self.snitch_path(token)),
            None,
            None,
        );
        self.perform_request(RequestKind::Api, &options).await
    }

    /// Delete a snitch.
    pub async fn delete_snitch(&self, token: &str) -> Result<Reply, Error> {
        self.check_api_key()?;
        let options = RequestOptions::new(Method::DELETE, self.snitch_path(token), None, None);
        self.perform_request(RequestKind::Api, &options).await
    }
}

fn validate_choice(value: &str, name: &str, label: &str, valid: &[&str]) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::InvalidArgument(format!(
            "The '{}' value must be a non-empty string",
            name
        )));
    }
    if !valid.contains(&value) {
        return Err(Error::InvalidArgument(format!(
            "Received an invalid snitch {} value. Must be one of: {}",
            label,
            valid.join(", ")
        )));
    }
    Ok(())
}
