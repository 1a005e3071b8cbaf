//! Dead Man's Snitch client library.
//!
//! Provides a client for snitch check-ins and the Dead Man's Snitch REST API:
//! listing, filtering, creating, updating, tagging, pausing, and deleting
//! snitches.

pub mod client;
pub mod config;
pub mod delivery;
pub mod error;
pub mod helpers;
pub mod request;
pub mod status;

pub use client::{
    Client, FullResponse, Reply, SNITCH_ALERT_TYPES, SNITCH_INTERVALS, SNITCH_STATUSES,
};
pub use config::{resolve_api_key, ClientConfig, API_KEY_ENV};
pub use delivery::with_callback;
pub use error::{Error, RequestError, StatusCodeError, TransportError};
pub use helpers::{format_timestamp_display, token_from_arg};
pub use request::{RequestKind, RequestOptions};

/// Library version for User-Agent and diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
