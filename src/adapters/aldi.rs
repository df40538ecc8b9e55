//! Aldi: the one retailer speaking a JSON API instead of scraped HTML.
//!
//! `spec.md §9` Open Question: "Aldi 'price-per-unit' string contributes
//! the unit but the price is sourced from a separate field; this
//! asymmetric parse is deliberate." [`AldiItem::price_per_uom`] supplies
//! only the [`Unit`], never its own `amount_cents` — the [`PricePU`]'s
//! price always comes from the item's own `price_cents` field.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;

use crate::product::{Depth, Product, ProductList, QueryResultInfo};
use crate::store_id::StoreID;
use crate::transfer::{HeaderSet, RequestOptions};
use crate::value::{Currency, Price, PricePU, Unit};

use super::RetailerAdapter;

const SEARCH_BASE: &str = "https://groceries.aldi.ie/api/v2/product-search";
const PRODUCT_BASE: &str = "https://groceries.aldi.ie/api/v2/products";

fn uom_to_unit(uom: &str) -> Option<Unit> {
    match uom.to_ascii_uppercase().as_str() {
        "KG" => Some(Unit::Kilogrammes),
        "L" => Some(Unit::Litres),
        "EA" => Some(Unit::Piece),
        "M" => Some(Unit::Metres),
        "M2" => Some(Unit::SqMetres),
        _ => None,
    }
}

fn json_headers() -> HeaderSet {
    let mut headers = HashMap::new();
    headers.insert("Accept".to_owned(), "application/json".to_owned());
    Arc::new(headers)
}

#[derive(Debug, Deserialize)]
struct AldiSearchResponse {
    #[serde(default)]
    results: Vec<AldiItem>,
}

#[derive(Debug, Deserialize)]
struct AldiItem {
    sku: String,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image_url: String,
    #[serde(default)]
    url: String,
    price_cents: u64,
    #[serde(default)]
    price_per_uom: Option<AldiPricePerUom>,
}

#[derive(Debug, Deserialize)]
struct AldiPricePerUom {
    uom: String,
    /// Deliberately unused: see module docs.
    #[serde(default)]
    #[allow(dead_code)]
    amount_cents: Option<u64>,
}

impl AldiItem {
    fn into_product(self) -> Product {
        let item_price = Price::new(Currency::Eur, self.price_cents);
        let price_per_unit = self
            .price_per_uom
            .as_ref()
            .and_then(|p| uom_to_unit(&p.uom))
            .map_or_else(|| PricePU::new(item_price, Unit::Piece), |unit| PricePU::new(item_price, unit));

        Product {
            id: format!("{}{}", StoreID::Aldi.id_prefix(), self.sku),
            name: self.name,
            description: self.description,
            image_url: self.image_url,
            url: self.url,
            item_price,
            price_per_unit,
            store: StoreID::Aldi,
            timestamp: Utc::now(),
            full_info: false,
            offers: Vec::new(),
        }
    }
}

/// The Aldi retailer adapter.
pub struct AldiAdapter;

impl AldiAdapter {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Default for AldiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RetailerAdapter for AldiAdapter {
    fn store_id(&self) -> StoreID {
        StoreID::Aldi
    }

    fn build_search_url(&self, query: &str) -> String {
        format!("{SEARCH_BASE}?q={}", urlencoding::encode(query))
    }

    fn build_search_request_options(&self) -> RequestOptions {
        RequestOptions::get_with_headers(json_headers())
    }

    fn build_product_url_request_options(&self) -> RequestOptions {
        RequestOptions::get_with_headers(json_headers())
    }

    fn parse_search_response(&self, body: &[u8], depth: Depth) -> ProductList {
        let parsed: AldiSearchResponse = match serde_json::from_slice(body) {
            Ok(parsed) => parsed,
            Err(error) => {
                tracing::warn!(error = %error, "failed to parse Aldi search response");
                return ProductList::from_entries(Vec::new(), depth);
            }
        };

        let max = match depth {
            Depth::Indefinite => usize::MAX,
            Depth::Levels(n) => n as usize,
        };

        let entries = parsed
            .results
            .into_iter()
            .take(max)
            .enumerate()
            .map(|(relevance, item)| (item.into_product(), QueryResultInfo { relevance: relevance as u32 }))
            .collect();

        ProductList::from_entries(entries, depth)
    }

    fn parse_product_page(&self, body: &[u8], _url: &str) -> Option<Product> {
        let item: AldiItem = match serde_json::from_slice(body) {
            Ok(item) => item,
            Err(error) => {
                tracing::warn!(error = %error, "failed to parse Aldi product page");
                return None;
            }
        };
        let mut product = item.into_product();
        product.full_info = true;
        Some(product)
    }
}

impl AldiAdapter {
    /// The product-page endpoint for a given native SKU.
    #[must_use]
    pub fn build_product_url(&self, native_sku: &str) -> String {
        format!("{PRODUCT_BASE}/{native_sku}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_results_and_ignores_nested_uom_amount() {
        let body = br#"{"results": [
            {"sku": "1001", "name": "Milk 2L", "price_cents": 199,
             "price_per_uom": {"uom": "L", "amount_cents": 99999}}
        ]}"#;
        let adapter = AldiAdapter::new();
        let list = adapter.parse_search_response(body, Depth::Indefinite);
        let product = list.products().next().unwrap();
        assert_eq!(product.id, "AL1001");
        assert_eq!(product.price_per_unit.unit, Unit::Litres);
        // The price comes from the item's own `price_cents`, never the
        // nested uom's `amount_cents` — the asymmetric parse is deliberate.
        assert_eq!(product.price_per_unit.price.value, 199);
    }

    #[test]
    fn missing_uom_falls_back_to_piece() {
        let body = br#"{"results": [{"sku": "1002", "name": "Bread", "price_cents": 250}]}"#;
        let adapter = AldiAdapter::new();
        let list = adapter.parse_search_response(body, Depth::Indefinite);
        let product = list.products().next().unwrap();
        assert_eq!(product.price_per_unit.unit, Unit::Piece);
    }

    #[test]
    fn depth_caps_number_of_parsed_items() {
        let body = br#"{"results": [
            {"sku": "1", "name": "A", "price_cents": 100},
            {"sku": "2", "name": "B", "price_cents": 200}
        ]}"#;
        let adapter = AldiAdapter::new();
        let list = adapter.parse_search_response(body, Depth::Levels(1));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn malformed_json_yields_empty_list_not_a_panic() {
        let adapter = AldiAdapter::new();
        let list = adapter.parse_search_response(b"not json", Depth::Indefinite);
        assert!(list.is_empty());
    }
}
