//! [`Offer`]: promotional annotations attached to a product row.
//!
//! Not present in `original_source` (the distilled spec supplements it); the
//! shape follows `spec.md §3` directly, parsed case-insensitively against a
//! small set of known patterns, with unrecognised text kept verbatim rather
//! than dropped (`spec.md §7`: "unparseable text is retained verbatim").

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::Price;

/// A promotional offer attached to a product.
///
/// Each variant models one of the bulk/percentage/absolute/deduction
/// reduction shapes named in `spec.md §3`; `Unrecognised` is the fallback
/// for text that parses as "some kind of offer" (it was present on the
/// page) but doesn't match a known pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Offer {
    /// "N for €X" — buy a fixed quantity of the *same* product for a fixed
    /// total price.
    MultipleForReducedPrice {
        /// Original promotional text.
        text: String,
        /// Number of units required.
        bulk_amount: u32,
        /// Total price for `bulk_amount` units.
        price: Price,
        /// Whether this offer requires loyalty-card membership.
        membership_only: bool,
        /// When the offer expires, if known.
        expiry: Option<DateTime<Utc>>,
    },
    /// "Any N for €X" — buy a fixed quantity of *any* qualifying product
    /// (not necessarily the same one) for a fixed total price.
    MultipleHeterogeneousForReducedPrice {
        /// Original promotional text.
        text: String,
        /// Number of units required.
        bulk_amount: u32,
        /// Total price for `bulk_amount` units.
        price: Price,
        /// Whether this offer requires loyalty-card membership.
        membership_only: bool,
        /// When the offer expires, if known.
        expiry: Option<DateTime<Utc>>,
    },
    /// "Only €X" — a flat reduced price, independent of the usual unit
    /// price.
    ReducedPriceAbsolute {
        /// Original promotional text.
        text: String,
        /// The reduced price.
        price: Price,
        /// Whether this offer requires loyalty-card membership.
        membership_only: bool,
        /// When the offer expires, if known.
        expiry: Option<DateTime<Utc>>,
    },
    /// "Save P%" / "Half price" — a percentage reduction off the usual
    /// price.
    ReducedPricePercentage {
        /// Original promotional text.
        text: String,
        /// Multiplier applied to the usual price (e.g. `0.5` for half
        /// price, `0.8` for "Save 20%").
        price_reduction_multiplier: f64,
        /// Whether this offer requires loyalty-card membership.
        membership_only: bool,
        /// When the offer expires, if known.
        expiry: Option<DateTime<Utc>>,
    },
    /// "Save €X" — a flat deduction off the usual price.
    ReducedPriceDeduction {
        /// Original promotional text.
        text: String,
        /// Amount deducted from the usual price.
        price: Price,
        /// Whether this offer requires loyalty-card membership.
        membership_only: bool,
        /// When the offer expires, if known.
        expiry: Option<DateTime<Utc>>,
    },
    /// Text that looked like a promotional annotation but didn't match any
    /// recognised pattern; kept verbatim.
    Unrecognised {
        /// Original promotional text.
        text: String,
    },
}

impl Offer {
    /// The original promotional text, regardless of variant.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::MultipleForReducedPrice { text, .. }
            | Self::MultipleHeterogeneousForReducedPrice { text, .. }
            | Self::ReducedPriceAbsolute { text, .. }
            | Self::ReducedPricePercentage { text, .. }
            | Self::ReducedPriceDeduction { text, .. }
            | Self::Unrecognised { text } => text,
        }
    }

    /// Parse free-form promotional text into a typed [`Offer`].
    ///
    /// Matching is case-insensitive; a `membership_only` flag is detected by
    /// the presence of common loyalty-scheme markers ("clubcard price",
    /// "members only", "loyalty price") anywhere in the text, which are then
    /// stripped before the remaining pattern match runs.
    #[must_use]
    pub fn parse(text: &str, expiry: Option<DateTime<Utc>>) -> Self {
        const MEMBERSHIP_MARKERS: &[&str] =
            &["clubcard price", "members only", "loyalty price", "member price"];

        let lowered = text.to_lowercase();
        let membership_only = MEMBERSHIP_MARKERS.iter().any(|marker| lowered.contains(marker));

        // Strip membership markers (and any punctuation/whitespace glue
        // around them) before pattern matching, so e.g. "Clubcard Price:
        // Only €1.00" still matches the `only ` pattern for the price
        // itself.
        let mut cleaned = lowered.clone();
        for marker in MEMBERSHIP_MARKERS {
            if let Some(pos) = cleaned.find(marker) {
                cleaned.replace_range(pos..pos + marker.len(), "");
            }
        }
        let cleaned = cleaned.trim_matches(|c: char| c.is_whitespace() || c == ':').trim();

        if let Some(offer) = Self::try_multiple_heterogeneous(text, cleaned, membership_only, expiry) {
            return offer;
        }
        if let Some(offer) = Self::try_multiple(text, cleaned, membership_only, expiry) {
            return offer;
        }
        if let Some(offer) = Self::try_absolute(text, cleaned, membership_only, expiry) {
            return offer;
        }
        if let Some(offer) = Self::try_percentage(text, cleaned, membership_only, expiry) {
            return offer;
        }
        if let Some(offer) = Self::try_deduction(text, cleaned, membership_only, expiry) {
            return offer;
        }

        tracing::warn!(text, "offer text did not match a known pattern");
        Self::Unrecognised { text: text.to_owned() }
    }

    fn try_multiple_heterogeneous(
        text: &str,
        cleaned: &str,
        membership_only: bool,
        expiry: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        let rest = cleaned.strip_prefix("any ")?;
        let (amount_str, rest) = rest.split_once(" for ")?;
        let bulk_amount: u32 = amount_str.trim().parse().ok()?;
        let price = Price::parse(rest.trim()).ok()?;
        Some(Self::MultipleHeterogeneousForReducedPrice {
            text: text.to_owned(),
            bulk_amount,
            price,
            membership_only,
            expiry,
        })
    }

    fn try_multiple(
        text: &str,
        cleaned: &str,
        membership_only: bool,
        expiry: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        let (amount_str, rest) = cleaned.split_once(" for ")?;
        let bulk_amount: u32 = amount_str.trim().parse().ok()?;
        let price = Price::parse(rest.trim()).ok()?;
        Some(Self::MultipleForReducedPrice {
            text: text.to_owned(),
            bulk_amount,
            price,
            membership_only,
            expiry,
        })
    }

    fn try_absolute(
        text: &str,
        cleaned: &str,
        membership_only: bool,
        expiry: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        let rest = cleaned.strip_prefix("only ")?;
        let price = Price::parse(rest.trim()).ok()?;
        Some(Self::ReducedPriceAbsolute {
            text: text.to_owned(),
            price,
            membership_only,
            expiry,
        })
    }

    fn try_percentage(
        text: &str,
        cleaned: &str,
        membership_only: bool,
        expiry: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        if cleaned.contains("half price") {
            return Some(Self::ReducedPricePercentage {
                text: text.to_owned(),
                price_reduction_multiplier: 0.5,
                membership_only,
                expiry,
            });
        }

        let rest = cleaned.strip_prefix("save ")?;
        let rest = rest.strip_suffix('%')?;
        let percent_off: f64 = rest.trim().parse().ok()?;
        if !(0.0..=100.0).contains(&percent_off) {
            return None;
        }
        Some(Self::ReducedPricePercentage {
            text: text.to_owned(),
            price_reduction_multiplier: 1.0 - percent_off / 100.0,
            membership_only,
            expiry,
        })
    }

    fn try_deduction(
        text: &str,
        cleaned: &str,
        membership_only: bool,
        expiry: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        let rest = cleaned.strip_prefix("save ")?;
        let price = Price::parse(rest.trim()).ok()?;
        Some(Self::ReducedPriceDeduction {
            text: text.to_owned(),
            price,
            membership_only,
            expiry,
        })
    }
}
