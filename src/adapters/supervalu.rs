//! Wiring for the four HTML-scraped retailers onto the shared
//! [`super::html_common::HtmlAdapter`] engine.
//!
//! `spec.md §4.3`: "the specification does not pin selector strings, which
//! are data, not design" — SuperValu, Lidl, Tesco, and Dunnes Stores differ
//! only in homepage and CSS-class fragments, grounded on
//! `original_source/webscraper/stores.cpp`'s per-store `SearchClass`/
//! `SearchAttr` fragments for each.

use std::sync::Arc;

use crate::store_id::StoreID;

use super::html_common::{HtmlAdapter, HtmlAdapterConfig};
use super::RetailerAdapter;

fn supervalu() -> HtmlAdapterConfig {
    HtmlAdapterConfig {
        store: StoreID::SuperValu,
        homepage: "https://shop.supervalu.ie/sm/delivery/rsid/5050/".to_owned(),
        item_listing_class: "ColListing".to_owned(),
        name_id_attr: "data-testid".to_owned(),
        name_id_attr_value: "ProductNameTestId".to_owned(),
        price_class: "ProductCardPrice-".to_owned(),
        price_per_class: "ProductCardPriceInfo".to_owned(),
        image_class: "ProductCardImage-".to_owned(),
        url_class: "ProductCardHiddenLink".to_owned(),
    }
}

fn lidl() -> HtmlAdapterConfig {
    HtmlAdapterConfig {
        store: StoreID::Lidl,
        homepage: "https://www.lidl.ie/".to_owned(),
        item_listing_class: "ProductGridBox".to_owned(),
        name_id_attr: "data-grid-title".to_owned(),
        name_id_attr_value: "AssortmentODProduct".to_owned(),
        price_class: "ProductGridBox__Price-".to_owned(),
        price_per_class: "ProductGridBox__BasePrice-".to_owned(),
        image_class: "ProductGridBox__Image-".to_owned(),
        url_class: "ProductGridBox__Link-".to_owned(),
    }
}

fn tesco() -> HtmlAdapterConfig {
    HtmlAdapterConfig {
        store: StoreID::Tesco,
        homepage: "https://www.tesco.ie/groceries/en-IE/".to_owned(),
        item_listing_class: "product-list--list-item".to_owned(),
        name_id_attr: "data-auto".to_owned(),
        name_id_attr_value: "product-tile--title".to_owned(),
        price_class: "price-control-wrapper__cost-of-quantity".to_owned(),
        price_per_class: "price-per-quantity-weight".to_owned(),
        image_class: "product-image__wrapper".to_owned(),
        url_class: "product-tile--title-link".to_owned(),
    }
}

fn dunnes_stores() -> HtmlAdapterConfig {
    HtmlAdapterConfig {
        store: StoreID::DunnesStores,
        homepage: "https://www.dunnesstoresgrocery.com/".to_owned(),
        item_listing_class: "product-tile".to_owned(),
        name_id_attr: "data-testid".to_owned(),
        name_id_attr_value: "product-tile-name".to_owned(),
        price_class: "product-tile-price-now".to_owned(),
        price_per_class: "product-tile-price-per-unit".to_owned(),
        image_class: "product-tile-image".to_owned(),
        url_class: "product-tile-link".to_owned(),
    }
}

/// The four HTML-scraped retailer adapters, ready to hand to
/// [`super::AdapterRegistry`].
#[must_use]
pub fn html_adapters() -> Vec<Arc<dyn RetailerAdapter>> {
    vec![
        Arc::new(HtmlAdapter::new(supervalu())),
        Arc::new(HtmlAdapter::new(lidl())),
        Arc::new(HtmlAdapter::new(tesco())),
        Arc::new(HtmlAdapter::new(dunnes_stores())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_html_adapter_reports_its_own_store_id() {
        let adapters = html_adapters();
        let stores: Vec<_> = adapters.iter().map(|a| a.store_id()).collect();
        assert_eq!(
            stores,
            vec![StoreID::SuperValu, StoreID::Lidl, StoreID::Tesco, StoreID::DunnesStores]
        );
    }

    #[test]
    fn search_urls_are_escaped_and_store_specific() {
        let adapters = html_adapters();
        let url = adapters[0].build_search_url("free range eggs");
        assert!(url.starts_with("https://shop.supervalu.ie/"));
        assert!(url.contains("free%20range%20eggs") || url.contains("free+range+eggs"));
    }
}
