//! The document-store gateway (`spec.md §4.4`): typed bulk get/put over two
//! logical collections, `products` and `queries`.
//!
//! The document store itself (MongoDB in `original_source`) is out of
//! scope; this module specifies only the trait boundary plus an in-memory
//! implementation exercising it.

mod memory;

pub use memory::InMemoryStore;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::StoreError;
use crate::product::{Product, QueryTemplate};

/// A typed bulk get/put document store.
///
/// `spec.md §4.4`: `GetMany` omits missing keys from its result map rather
/// than erroring; `PutMany` is semantically delete-by-keys then
/// insert-all, with each key's final state always the newly written value.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Bulk-fetch products by id; absent ids are simply missing from the
    /// result.
    async fn get_products(&self, keys: &[String]) -> Result<HashMap<String, Product>, StoreError>;

    /// Bulk-write products, replacing each by id.
    async fn put_products(&self, products: Vec<Product>) -> Result<(), StoreError>;

    /// Fetch the cached [`QueryTemplate`] for `query_string`, if any.
    async fn get_query(&self, query_string: &str) -> Result<Option<QueryTemplate>, StoreError>;

    /// Replace the cached template for `template.query_string`.
    async fn put_query(&self, template: QueryTemplate) -> Result<(), StoreError>;
}
