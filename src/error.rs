//! Shared error types for the aggregation core.
//!
//! Each layer gets its own `thiserror` enum rather than funnelling everything
//! into one kitchen-sink type; this mirrors the teacher crate's preference
//! for small, purpose-built error types (e.g. `ParseCurrencyError`,
//! `InvalidInMsg`) over a single catch-all.

use thiserror::Error;

/// Failure parsing a [`crate::value::Price`] from its textual form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid price string: {0:?}")]
pub struct PriceParseError(pub String);

/// Failure parsing a [`crate::value::PricePU`] from its textual form.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PricePuParseError {
    /// The string was empty.
    #[error("empty price-per-unit string")]
    Empty,
    /// No recognised separator (`" per "`, `"/"`, `" "`) was found.
    #[error("no recognised unit separator in {0:?}")]
    NoSeparator(String),
    /// The unit text after the separator isn't in the conversion table.
    #[error("unrecognised unit {0:?}")]
    UnknownUnit(String),
    /// The price portion before the separator failed to parse.
    #[error("invalid price portion in {0:?}: {1}")]
    InvalidPrice(String, PriceParseError),
}

/// Errors surfaced by the HTTP transfer driver to a submission's completion.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The underlying HTTP client reported a transport-level failure
    /// (connect/read/TLS).
    #[error("transport error fetching {url}: {source}")]
    Transport {
        /// The URL that was being fetched.
        url: String,
        /// The underlying `reqwest` error.
        #[source]
        source: reqwest::Error,
    },
    /// The response came back with a non-success HTTP status.
    #[error("non-OK status {status} fetching {url}")]
    Status {
        /// The URL that was fetched.
        url: String,
        /// The HTTP status code received.
        status: u16,
    },
    /// The driver's event-loop task has shut down or its channel is full.
    #[error("transfer driver unavailable: {0}")]
    DriverUnavailable(String),
}

/// Errors from the document-store gateway.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested key (or the whole collection) had no record.
    #[error("not found")]
    NotFound,
    /// The gateway could not reach its backing store.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    /// Any other backend failure.
    #[error("store error: {0}")]
    Other(String),
}

/// Errors from the message-bus front-end.
#[derive(Debug, Error)]
pub enum BusError {
    /// The bus peer is not currently connected.
    #[error("not connected to bus")]
    Disconnected,
    /// A message failed validation against the expected JSON schema.
    #[error("message failed validation: {0}")]
    InvalidMessage(String),
    /// The underlying transport reported a send failure.
    #[error("bus send failed: {0}")]
    SendFailed(String),
}

/// Errors loading or parsing the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be opened/read.
    #[error("could not read config file at {path}: {source}")]
    Io {
        /// Path that was attempted.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
    /// The file contents were not valid JSON, or were missing required keys.
    #[error("invalid config file at {path}: {source}")]
    Invalid {
        /// Path that was attempted.
        path: String,
        /// Underlying (de)serialization error.
        #[source]
        source: serde_json::Error,
    },
}
