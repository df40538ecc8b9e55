//! [`Product`], [`QueryResultInfo`], [`QueryTemplate`], and [`ProductList`].
//!
//! Grounded on `original_source/common/product.hpp`/`product.cpp` (the
//! `Product` record and `ProductList::Add` merge logic) and
//! `original_source/webscraper/app.cpp` (the query/result bookkeeping that
//! becomes [`QueryTemplate`]).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store_id::{StoreID, StoreSelection};
use crate::value::{Offer, Price, PricePU};

/// How many result rows a query asked for, per retailer.
///
/// `spec.md §9` Open Question, resolved against
/// `original_source/common/product.cpp::ProductList::Add`: depths merge by
/// taking the `min`, with [`Depth::Indefinite`] acting as the identity (any
/// concrete depth beats "unknown how deep this went"). `spec.md §8`
/// boundary case: `depth = 0` behaves as [`Depth::Indefinite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Depth {
    /// No cap; as many results as the retailer returns.
    Indefinite,
    /// Capped at this many result rows.
    Levels(u32),
}

impl Depth {
    /// Decode the wire representation: `0` and negative-as-unsigned-sentinel
    /// both collapse to [`Depth::Indefinite`] per `spec.md §8`.
    #[must_use]
    pub const fn from_wire(value: u32) -> Self {
        if value == 0 {
            Self::Indefinite
        } else {
            Self::Levels(value)
        }
    }

    /// Combine two depths the way repeated contributions to the same query
    /// combine: the shallower (more conservative) depth wins, and
    /// [`Depth::Indefinite`] never wins over a concrete depth.
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        match (self, other) {
            (Self::Indefinite, other) | (other, Self::Indefinite) => other,
            (Self::Levels(a), Self::Levels(b)) => Self::Levels(a.min(b)),
        }
    }

    /// Whether a cache entry at `self` depth satisfies a request for
    /// `requested` depth (`spec.md §4.5` step 3: `cached.depth < depth`
    /// invalidates the cache).
    #[must_use]
    pub fn satisfies(self, requested: Self) -> bool {
        match (self, requested) {
            (Self::Indefinite, _) => true,
            (_, Self::Indefinite) => false,
            (Self::Levels(have), Self::Levels(want)) => have >= want,
        }
    }
}

impl Default for Depth {
    fn default() -> Self {
        Self::Indefinite
    }
}

/// A single retailer's record for one grocery item.
///
/// `spec.md §3`: produced by a retailer adapter, persisted by the resolver,
/// keyed by `id` in the document store's `products` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Globally-unique id: the store's [`StoreID::id_prefix`] followed by
    /// its native SKU.
    pub id: String,
    /// Display name as scraped/fetched.
    pub name: String,
    /// Short description, if the retailer publishes one.
    pub description: String,
    /// Absolute URL to a product image.
    pub image_url: String,
    /// Absolute URL to the product's own page.
    pub url: String,
    /// Current unit price.
    pub item_price: Price,
    /// Current price per standard unit; falls back to `{item_price, Piece}`
    /// when the adapter can't recover an explicit per-unit price
    /// (`spec.md §4.3`).
    pub price_per_unit: PricePU,
    /// Which retailer this record came from.
    pub store: StoreID,
    /// When this record was produced.
    pub timestamp: DateTime<Utc>,
    /// True only when produced from the product's dedicated page, as
    /// opposed to a search-result row.
    pub full_info: bool,
    /// Promotional offers currently attached to this item.
    pub offers: Vec<Offer>,
}

/// The zero-based position of a product within the search response that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResultInfo {
    /// Position in the originating search response.
    pub relevance: u32,
}

/// The cached record for a `(query_string, stores)` pair.
///
/// `spec.md §3`: replaced wholesale on each re-fetch; `results` keys must
/// also appear in the products store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTemplate {
    /// The search term this template answers.
    pub query_string: String,
    /// Which retailers were consulted to produce `results`.
    pub stores: StoreSelection,
    /// Product ids matched, each with its search-result position.
    pub results: HashMap<String, QueryResultInfo>,
    /// When this template was written.
    pub timestamp: DateTime<Utc>,
    /// The relevance cap in effect when this template was produced.
    pub depth: Depth,
}

/// An intermediate, non-persisted sequence of `(Product, QueryResultInfo)`
/// pairs accumulated while resolving one query, plus the effective depth.
///
/// Grounded on `original_source/common/product.cpp::ProductList`:
/// `add` concatenates and folds the depth via [`Depth::min`].
#[derive(Debug, Clone, Default)]
pub struct ProductList {
    entries: Vec<(Product, QueryResultInfo)>,
    depth: Depth,
}

impl ProductList {
    /// An empty list at [`Depth::Indefinite`].
    #[must_use]
    pub fn new() -> Self {
        Self { entries: Vec::new(), depth: Depth::Indefinite }
    }

    /// A list built from adapter output, stamped with the depth the
    /// retailer was asked to resolve to.
    #[must_use]
    pub fn from_entries(entries: Vec<(Product, QueryResultInfo)>, depth: Depth) -> Self {
        Self { entries, depth }
    }

    /// The effective depth: the minimum over every merged sub-list.
    #[must_use]
    pub const fn depth(&self) -> Depth {
        self.depth
    }

    /// Number of entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list holds no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append `other`'s entries (preserving arrival order) and fold its
    /// depth into this list's via [`Depth::min`].
    pub fn add(&mut self, other: Self) {
        self.depth = self.depth.min(other.depth);
        self.entries.extend(other.entries);
    }

    /// Iterate over the contained `(Product, QueryResultInfo)` pairs, in
    /// insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(Product, QueryResultInfo)> {
        self.entries.iter()
    }

    /// Consume the list, discarding relevance info, for bulk persistence.
    #[must_use]
    pub fn into_products(self) -> Vec<Product> {
        self.entries.into_iter().map(|(p, _)| p).collect()
    }

    /// Borrow the contained products without consuming the list.
    pub fn products(&self) -> impl Iterator<Item = &Product> {
        self.entries.iter().map(|(p, _)| p)
    }

    /// Build the `results` map a [`QueryTemplate`] would record for this
    /// list: product id to its [`QueryResultInfo`].
    #[must_use]
    pub fn as_results_map(&self) -> HashMap<String, QueryResultInfo> {
        self.entries.iter().map(|(p, info)| (p.id.clone(), *info)).collect()
    }

    /// The set of stores contributing to this list.
    #[must_use]
    pub fn stores(&self) -> StoreSelection {
        self.entries.iter().map(|(p, _)| p.store).collect()
    }
}
