//! The price/unit/offer value model (`spec.md §3`, component A).

mod currency;
mod offer;
mod price;
mod unit;

pub use currency::Currency;
pub use offer::Offer;
pub use price::Price;
pub use unit::{PricePU, Unit};
