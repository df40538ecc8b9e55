//! Per-transfer request options (`spec.md §4.1` contract).

use std::collections::HashMap;
use std::sync::Arc;

/// HTTP method a submission may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// An immutable, shareable named header-set, built once per retailer
/// adapter and referenced by every request it issues.
pub type HeaderSet = Arc<HashMap<String, String>>;

/// Options accompanying one transfer submission.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// GET or POST.
    pub method: Method,
    /// POST body, if any.
    pub body: Option<Vec<u8>>,
    /// Headers to send in addition to the driver's global user-agent.
    pub headers: HeaderSet,
}

impl RequestOptions {
    /// A plain GET with no extra headers.
    #[must_use]
    pub fn get() -> Self {
        Self { method: Method::Get, body: None, headers: Arc::new(HashMap::new()) }
    }

    /// A GET with the given header-set (e.g. `Accept: application/json`).
    #[must_use]
    pub fn get_with_headers(headers: HeaderSet) -> Self {
        Self { method: Method::Get, body: None, headers }
    }

    /// A POST with the given body and header-set.
    #[must_use]
    pub fn post(body: Vec<u8>, headers: HeaderSet) -> Self {
        Self { method: Method::Post, body: Some(body), headers }
    }
}
