//! The retailer adapter registry (`spec.md §4.3`).

mod aldi;
mod html_common;
mod supervalu;

use std::collections::HashMap;
use std::sync::Arc;

use crate::product::{Depth, Product};
use crate::store_id::StoreID;
use crate::transfer::RequestOptions;

/// Per-retailer URL building, request-option selection, and response
/// parsing.
///
/// `spec.md §9`: "Prefer a trait/interface with one concrete implementation
/// per retailer... allows per-retailer state (compiled regexes, pre-built
/// header lists) without globals."
pub trait RetailerAdapter: Send + Sync {
    /// Which retailer this adapter speaks for.
    fn store_id(&self) -> StoreID;

    /// Build the search URL for `query`, URL-escaping it into the
    /// retailer's template.
    fn build_search_url(&self, query: &str) -> String;

    /// Method and headers to use for a search request.
    fn build_search_request_options(&self) -> RequestOptions;

    /// Parse a search response body into a [`crate::product::ProductList`]
    /// of at most `depth` entries, each stamped with its 0-based position
    /// as relevance.
    fn parse_search_response(&self, body: &[u8], depth: Depth) -> crate::product::ProductList;

    /// Method and headers to use for a single-product page request.
    fn build_product_url_request_options(&self) -> RequestOptions;

    /// Parse a single product's page into a [`Product`] with
    /// `full_info = true`.
    fn parse_product_page(&self, body: &[u8], url: &str) -> Option<Product>;
}

/// The set of adapters the resolver dispatches to, keyed by [`StoreID`].
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<StoreID, Arc<dyn RetailerAdapter>>,
}

impl AdapterRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { adapters: HashMap::new() }
    }

    /// The registry populated with every retailer this crate knows about.
    #[must_use]
    pub fn with_known_retailers() -> Self {
        let mut registry = Self::new();
        for adapter in supervalu::html_adapters() {
            registry.register(adapter);
        }
        registry.register(Arc::new(aldi::AldiAdapter::new()));
        registry
    }

    /// Register (or replace) the adapter for its own [`StoreID`].
    pub fn register(&mut self, adapter: Arc<dyn RetailerAdapter>) {
        self.adapters.insert(adapter.store_id(), adapter);
    }

    /// Look up the adapter for `store`.
    #[must_use]
    pub fn get(&self, store: StoreID) -> Option<Arc<dyn RetailerAdapter>> {
        self.adapters.get(&store).cloned()
    }

    /// Every retailer this registry has an adapter for.
    pub fn stores(&self) -> impl Iterator<Item = StoreID> + '_ {
        self.adapters.keys().copied()
    }
}
