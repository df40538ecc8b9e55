//! [`InMemoryStore`]: a reference [`DocumentStore`] backed by two
//! `HashMap`s behind a mutex, for tests and local/offline runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::gateway::DocumentStore;
use crate::product::{Product, QueryTemplate};

/// An in-process document store. Never fails on its own; tests that need to
/// exercise a caller's error-handling path can arm [`InMemoryStore::fail_next_call`]
/// to make the next single method call return
/// [`StoreError::ConnectionFailed`] before falling back to normal behaviour.
#[derive(Default)]
pub struct InMemoryStore {
    products: Mutex<HashMap<String, Product>>,
    queries: Mutex<HashMap<String, QueryTemplate>>,
    fail_next: AtomicBool,
}

impl InMemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a one-shot failure: the next call to any [`DocumentStore`]
    /// method on this store returns `Err(StoreError::ConnectionFailed(_))`
    /// instead of running, then the store resumes normal behaviour.
    pub fn fail_next_call(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn take_injected_failure(&self) -> Option<StoreError> {
        self.fail_next
            .swap(false, Ordering::SeqCst)
            .then(|| StoreError::ConnectionFailed("injected failure".to_owned()))
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn get_products(&self, keys: &[String]) -> Result<HashMap<String, Product>, StoreError> {
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }
        let products = self.products.lock().expect("store mutex poisoned");
        Ok(keys
            .iter()
            .filter_map(|key| products.get(key).map(|p| (key.clone(), p.clone())))
            .collect())
    }

    async fn put_products(&self, products: Vec<Product>) -> Result<(), StoreError> {
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }
        let mut store = self.products.lock().expect("store mutex poisoned");
        for product in products {
            store.insert(product.id.clone(), product);
        }
        Ok(())
    }

    async fn get_query(&self, query_string: &str) -> Result<Option<QueryTemplate>, StoreError> {
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }
        let queries = self.queries.lock().expect("store mutex poisoned");
        Ok(queries.get(query_string).cloned())
    }

    async fn put_query(&self, template: QueryTemplate) -> Result<(), StoreError> {
        if let Some(error) = self.take_injected_failure() {
            return Err(error);
        }
        let mut store = self.queries.lock().expect("store mutex poisoned");
        store.insert(template.query_string.clone(), template);
        Ok(())
    }
}
