//! Error types for the Dead Man's Snitch client.
//!
//! Failures fall into two groups. Local validation errors are raised before
//! any network call. Everything else starts life as a [`TransportError`], a
//! transport-neutral description of what went wrong, and is classified by
//! [`normalize`] into a [`RequestError`], a [`StatusCodeError`], or passed
//! through unchanged.

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

/// Base error type for Dead Man's Snitch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The client options were not a key/value mapping or held an unusable value.
    #[error("{0}")]
    InvalidOptions(String),

    #[error("A Dead Man's Snitch Api Key is required for this action")]
    MissingApiKey,

    /// A caller-supplied argument failed validation (filter value, tags).
    #[error("{0}")]
    InvalidArgument(String),

    /// The request descriptor or request kind handed to the dispatcher was unusable.
    #[error("{0}")]
    InvalidRequest(String),

    /// No sender exists for the requested host.
    #[error("{0}")]
    Misconfigured(String),

    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    StatusCode(#[from] StatusCodeError),

    /// A transport failure that matched neither the request nor the response shape.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The service answered successfully but with a payload we cannot work with.
    #[error("{0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// True for errors raised locally before any network attempt.
    ///
    /// These are surfaced to the caller directly even when a callback was
    /// supplied (see [`crate::delivery::with_callback`]).
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Error::InvalidOptions(_)
                | Error::MissingApiKey
                | Error::InvalidArgument(_)
                | Error::InvalidRequest(_)
                | Error::Misconfigured(_)
        )
    }

    /// HTTP status code when the service responded with an error status.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::StatusCode(e) => Some(e.status_code),
            _ => None,
        }
    }
}

/// Response details attached to a failed transport call.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub status: u16,
    pub status_text: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
}

/// Transport-neutral description of a failed HTTP call.
///
/// `has_request` records whether a request was actually issued (it carries
/// request context); `response` is present when the server answered.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    pub has_request: bool,
    pub response: Option<ErrorResponse>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl TransportError {
    /// A request was issued but no response came back.
    pub fn no_response(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            has_request: true,
            response: None,
            source: None,
        }
    }

    /// The server answered with an error status.
    pub fn with_response(message: impl Into<String>, response: ErrorResponse) -> Self {
        Self {
            message: message.into(),
            has_request: true,
            response: Some(response),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// The call never produced a response (network failure, timeout, DNS, refused connection).
#[derive(Error, Debug)]
#[error("{message}")]
pub struct RequestError {
    pub message: String,
    #[source]
    pub cause: TransportError,
}

/// The service responded with a non-success status.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct StatusCodeError {
    pub message: String,
    pub status_code: u16,
    pub status_message: String,
    pub headers: BTreeMap<String, String>,
    pub body: Value,
    #[source]
    pub cause: TransportError,
}

/// Classify a transport failure by its shape.
///
/// A response means [`StatusCodeError`]; request context without a response
/// means [`RequestError`]; anything else is returned as [`Error::Transport`].
pub fn normalize(err: TransportError) -> Error {
    if let Some(response) = err.response.clone() {
        let status_message = response
            .status_text
            .clone()
            .or_else(|| crate::status::reason_phrase(response.status).map(String::from))
            .unwrap_or_default();
        return Error::StatusCode(StatusCodeError {
            message: err.message.clone(),
            status_code: response.status,
            status_message,
            headers: response.headers,
            body: response.body,
            cause: err,
        });
    }
    if err.has_request {
        return Error::Request(RequestError {
            message: err.message.clone(),
            cause: err,
        });
    }
    Error::Transport(err)
}
