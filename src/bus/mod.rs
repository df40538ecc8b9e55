//! The message-bus front-end (`spec.md §4.6`): inbound `query` message
//! validation, the resolver dispatch loop, and the reconnect state machine.
//!
//! Grounded on `original_source/webserver/main.cpp::RetryConnection` (the
//! 5s/+5s/40s-cap/reset-on-success backoff) and
//! `original_source/common/validate.hpp`'s `QUERY` validation series, plus
//! `original_source/webscraper/app.cpp`'s `AddHandler("query", ...)` —
//! one term of a multi-term query fans out into its own resolver call.
//! The wire protocol itself (buxtehude) is out of scope per `spec.md §1`;
//! [`BusClient`] is the trait boundary, [`memory::InProcessBus`] its one
//! concrete implementation.

mod memory;

pub use memory::InProcessBus;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BusError;
use crate::product::Depth;
use crate::store_id::StoreSelection;

/// Initial reconnect wait, per `spec.md §4.6`.
pub const BASE_WAIT: Duration = Duration::from_secs(5);
/// Reconnect wait increment per consecutive failure.
pub const WAIT_INCREMENT: Duration = Duration::from_secs(5);
/// Reconnect wait ceiling.
pub const MAX_WAIT: Duration = Duration::from_secs(40);

/// A validated inbound `query` message (`spec.md §4.6`'s fixed JSON schema).
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMessage {
    /// Sender address the bus client should route `query-result` replies to.
    pub src: String,
    /// One resolver call is made per term.
    pub terms: Vec<String>,
    /// Echoed back verbatim on each `query-result` reply.
    pub request_id: i64,
    /// Decoded from the wire's integer bit-field.
    pub stores: StoreSelection,
    /// Decoded via [`Depth::from_wire`] (`0` means [`Depth::Indefinite`]).
    pub depth: Depth,
    /// Bypass the cache for every term in this message.
    pub force_refresh: bool,
}

/// Validate and decode a raw inbound message against `spec.md §4.6`'s
/// schema: `terms` (array of non-empty strings), `request-id` (number),
/// `stores` (number), `depth` (number), `force-refresh` (bool).
pub fn parse_query_message(src: impl Into<String>, content: &Value) -> Result<QueryMessage, BusError> {
    let terms = content
        .get("terms")
        .and_then(Value::as_array)
        .ok_or_else(|| BusError::InvalidMessage("missing or non-array \"terms\"".to_owned()))?;

    let terms: Vec<String> = terms
        .iter()
        .map(|term| match term.as_str() {
            Some(s) if !s.is_empty() => Ok(s.to_owned()),
            Some(_) => Err(BusError::InvalidMessage("\"terms\" contains an empty string".to_owned())),
            None => Err(BusError::InvalidMessage("\"terms\" contains a non-string element".to_owned())),
        })
        .collect::<Result<_, _>>()?;
    if terms.is_empty() {
        return Err(BusError::InvalidMessage("\"terms\" is empty".to_owned()));
    }

    let request_id = content
        .get("request-id")
        .and_then(Value::as_i64)
        .ok_or_else(|| BusError::InvalidMessage("missing or non-number \"request-id\"".to_owned()))?;

    let stores = content
        .get("stores")
        .and_then(Value::as_u64)
        .ok_or_else(|| BusError::InvalidMessage("missing or non-number \"stores\"".to_owned()))?;

    let depth = content
        .get("depth")
        .and_then(Value::as_u64)
        .ok_or_else(|| BusError::InvalidMessage("missing or non-number \"depth\"".to_owned()))?;
    let depth = u32::try_from(depth)
        .map_err(|_| BusError::InvalidMessage("\"depth\" out of range".to_owned()))?;

    let force_refresh = content
        .get("force-refresh")
        .and_then(Value::as_bool)
        .ok_or_else(|| BusError::InvalidMessage("missing or non-bool \"force-refresh\"".to_owned()))?;

    Ok(QueryMessage {
        src: src.into(),
        terms,
        request_id,
        stores: StoreSelection::from_bits(stores),
        depth: Depth::from_wire(depth),
        force_refresh,
    })
}

/// Build the `query-result` reply for one resolved term
/// (`original_source/webscraper/app.cpp::SendQuery`'s `{term, request-id,
/// items}` shape).
#[must_use]
pub fn build_query_result(term: &str, request_id: i64, products: &[crate::product::Product]) -> Value {
    serde_json::json!({
        "term": term,
        "request-id": request_id,
        "items": products,
    })
}

/// Publish/subscribe transport the bus front-end runs over. The wire
/// protocol is out of scope (`spec.md §1`); this is the contract a real
/// buxtehude client would satisfy.
#[async_trait]
pub trait BusClient: Send + Sync {
    /// Attempt one connection. `Err` on failure; never retries internally —
    /// retry policy lives in [`Reconnector`].
    async fn connect(&self) -> Result<(), BusError>;

    /// Whether the client currently believes itself connected.
    async fn is_connected(&self) -> bool;

    /// Send `payload` addressed to `dest` (the `src` of the message being
    /// replied to, for `query-result`).
    async fn publish(&self, dest: &str, payload: Value) -> Result<(), BusError>;

    /// Wait for the next inbound message, as `(src, content)`. Returns
    /// `Err(BusError::Disconnected)` once the connection has dropped.
    async fn next_message(&self) -> Result<(String, Value), BusError>;
}

/// The reconnect backoff state machine (`spec.md §4.6`): 5 s initial wait,
/// +5 s per consecutive failure, capped at 40 s, reset to 5 s on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconnector {
    wait: Duration,
}

impl Reconnector {
    /// A fresh reconnector at the base wait time.
    #[must_use]
    pub const fn new() -> Self {
        Self { wait: BASE_WAIT }
    }

    /// The wait to apply before the next attempt.
    #[must_use]
    pub const fn current_wait(&self) -> Duration {
        self.wait
    }

    /// Record a failed attempt: returns the wait that should have preceded
    /// it (for logging) and advances the internal wait towards the cap.
    pub fn record_failure(&mut self) -> Duration {
        let wait = self.wait;
        if self.wait < MAX_WAIT {
            self.wait = (self.wait + WAIT_INCREMENT).min(MAX_WAIT);
        }
        wait
    }

    /// Record a successful connection: resets the wait to the base value.
    pub fn record_success(&mut self) {
        self.wait = BASE_WAIT;
    }
}

impl Default for Reconnector {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive one `client.connect()` retry loop until it succeeds, sleeping
/// between attempts per [`Reconnector`]. Returns once connected; callers
/// reinvoke this after a later disconnect.
pub async fn reconnect_loop(client: &dyn BusClient) {
    let mut backoff = Reconnector::new();
    loop {
        if client.connect().await.is_ok() {
            tracing::info!("reconnected to message bus");
            backoff.record_success();
            return;
        }
        let wait = backoff.record_failure();
        tracing::warn!(wait_secs = wait.as_secs(), "failed to connect to message bus, retrying");
        tokio::time::sleep(wait).await;
    }
}
