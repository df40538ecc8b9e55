//! A generic "SuperValu-like" HTML scraping strategy: meta-tag extraction
//! on product pages, CSS-class substring search on search-result pages.
//!
//! Grounded on `original_source/webscraper/stores.cpp`'s
//! `SV_GetProductAtURL`/`SV_Search`: the original's `SearchClass(...,
//! contains=true)` matches elements whose `class` attribute *contains* a
//! given substring (CSS-module-hashed class names like
//! `ProductCardPrice-a1b2c3`), which [`css_contains`] reproduces as a CSS
//! `[class*=...]` attribute selector. The spec treats the exact selector
//! strings as per-retailer data, not design, so every HTML retailer shares
//! this one engine parametrized by [`HtmlAdapterConfig`].

use chrono::Utc;
use scraper::{Html, Selector};

use crate::product::{Depth, Product, ProductList, QueryResultInfo};
use crate::store_id::StoreID;
use crate::transfer::RequestOptions;
use crate::value::{Price, PricePU, Unit};

use super::RetailerAdapter;

fn css_contains(class_fragment: &str) -> String {
    format!("[class*='{class_fragment}']")
}

fn select_first_text(root: &scraper::ElementRef, selector_str: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    root.select(&selector).next().map(|el| el.text().collect::<String>().trim().to_owned())
}

fn select_first_attr(root: &scraper::ElementRef, selector_str: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector_str).ok()?;
    root.select(&selector).next().and_then(|el| el.value().attr(attr)).map(str::to_owned)
}

/// The per-retailer data an [`HtmlAdapter`] is parametrized by: base URL and
/// the CSS-class fragments identifying each field on a search-result page.
#[derive(Debug, Clone)]
pub struct HtmlAdapterConfig {
    pub store: StoreID,
    /// Homepage, ending in `/`; the search URL appends `results?q=<query>`.
    pub homepage: String,
    /// Class fragment identifying one search-result listing element.
    pub item_listing_class: String,
    /// Attribute name carrying the product's data-testid-style identifier
    /// (the native SKU is the portion before the first `-`).
    pub name_id_attr: String,
    /// Attribute value (substring) identifying the name element.
    pub name_id_attr_value: String,
    /// Class fragment identifying the price element.
    pub price_class: String,
    /// Class fragment identifying the price-per-unit element.
    pub price_per_class: String,
    /// Class fragment identifying the product image element.
    pub image_class: String,
    /// Class fragment identifying the product-page-link element.
    pub url_class: String,
}

/// A retailer adapter driven entirely by an [`HtmlAdapterConfig`].
pub struct HtmlAdapter {
    config: HtmlAdapterConfig,
}

impl HtmlAdapter {
    #[must_use]
    pub const fn new(config: HtmlAdapterConfig) -> Self {
        Self { config }
    }
}

impl RetailerAdapter for HtmlAdapter {
    fn store_id(&self) -> StoreID {
        self.config.store
    }

    fn build_search_url(&self, query: &str) -> String {
        format!("{}results?q={}", self.config.homepage, urlencoding::encode(query))
    }

    fn build_search_request_options(&self) -> RequestOptions {
        RequestOptions::get()
    }

    fn build_product_url_request_options(&self) -> RequestOptions {
        RequestOptions::get()
    }

    fn parse_search_response(&self, body: &[u8], depth: Depth) -> ProductList {
        let text = String::from_utf8_lossy(body);
        let document = Html::parse_document(&text);

        let Ok(listing_selector) = Selector::parse(&css_contains(&self.config.item_listing_class)) else {
            return ProductList::from_entries(Vec::new(), depth);
        };
        let name_selector = format!(
            "[{}*='{}']",
            self.config.name_id_attr, self.config.name_id_attr_value
        );
        let price_selector = css_contains(&self.config.price_class);
        let price_per_selector = css_contains(&self.config.price_per_class);
        let image_selector = css_contains(&self.config.image_class);
        let url_selector = css_contains(&self.config.url_class);

        let max = match depth {
            Depth::Indefinite => usize::MAX,
            Depth::Levels(n) => n as usize,
        };

        let mut entries = Vec::new();
        for item in document.select(&listing_selector) {
            if entries.len() >= max {
                break;
            }

            let Some(name) = select_first_text(&item, &name_selector) else {
                tracing::warn!(store = ?self.config.store, "listing missing name element, skipping");
                continue;
            };
            if name.is_empty() {
                tracing::warn!(store = ?self.config.store, "listing name is empty, skipping");
                continue;
            }

            let Some(native_sku) = select_first_attr(&item, &name_selector, &self.config.name_id_attr)
                .and_then(|v| v.split('-').next().map(str::to_owned))
            else {
                tracing::warn!(store = ?self.config.store, "listing missing native sku, skipping");
                continue;
            };

            let Some(price_text) = select_first_text(&item, &price_selector) else {
                tracing::warn!(store = ?self.config.store, "listing missing price element, skipping");
                continue;
            };
            let Some(item_price) = Price::from_str_logged(&price_text) else {
                continue;
            };

            let price_per_unit = select_first_text(&item, &price_per_selector)
                .and_then(|text| PricePU::from_str_logged(&text))
                .unwrap_or_else(|| PricePU::new(item_price, Unit::Piece));

            let image_url = select_first_attr(&item, &image_selector, "src").unwrap_or_default();
            let url = select_first_attr(&item, &url_selector, "href").unwrap_or_default();

            let relevance = entries.len() as u32;
            entries.push((
                Product {
                    id: format!("{}{}", self.config.store.id_prefix(), native_sku),
                    name,
                    description: String::new(),
                    image_url,
                    url,
                    item_price,
                    price_per_unit,
                    store: self.config.store,
                    timestamp: Utc::now(),
                    full_info: false,
                    offers: Vec::new(),
                },
                QueryResultInfo { relevance },
            ));
        }

        ProductList::from_entries(entries, depth)
    }

    fn parse_product_page(&self, body: &[u8], url: &str) -> Option<Product> {
        let text = String::from_utf8_lossy(body);
        let document = Html::parse_document(&text);
        let meta_selector = Selector::parse("meta[itemprop]").ok()?;

        let mut name = None;
        let mut image_url = None;
        let mut description = None;
        let mut native_sku = None;
        let mut item_price = None;

        for meta in document.select(&meta_selector) {
            let Some(property) = meta.value().attr("itemprop") else { continue };
            let content = meta.value().attr("content").unwrap_or_default();
            match property {
                "name" => name = Some(content.to_owned()),
                "image" => {
                    image_url = meta.value().attr("href").map(str::to_owned).or_else(|| Some(content.to_owned()));
                }
                "description" => description = Some(content.to_owned()),
                "sku" => native_sku = Some(content.to_owned()),
                "price" => item_price = Price::from_str_logged(content),
                _ => {}
            }
        }

        let name = name?;
        let native_sku = native_sku?;
        let item_price = item_price?;

        let price_per_unit = select_first_text(&document.root_element(), &css_contains(&self.config.price_per_class))
            .and_then(|text| PricePU::from_str_logged(&text))
            .unwrap_or_else(|| PricePU::new(item_price, Unit::Piece));

        Some(Product {
            id: format!("{}{}", self.config.store.id_prefix(), native_sku),
            name,
            description: description.unwrap_or_default(),
            image_url: image_url.unwrap_or_default(),
            url: url.to_owned(),
            item_price,
            price_per_unit,
            store: self.config.store,
            timestamp: Utc::now(),
            full_info: true,
            offers: Vec::new(),
        })
    }
}
