//! [`Unit`] and [`PricePU`] (price per unit).

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

use crate::error::PricePuParseError;
use crate::value::Price;

/// The unit a [`PricePU`] is expressed in terms of.
///
/// `spec.md §3`: every non-`None` `PricePU` carries a `Unit` whose textual
/// suffix is one of a fixed set of strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// No unit is defined (should not appear on a populated `PricePU`).
    None = 0,
    /// Priced per individual item.
    Piece = 1,
    /// Priced per kilogramme.
    Kilogrammes = 2,
    /// Priced per litre.
    Litres = 3,
    /// Priced per square metre.
    SqMetres = 4,
    /// Priced per metre.
    Metres = 5,
}

impl Unit {
    /// The fixed textual suffix appended when formatting a price in this
    /// unit, per `spec.md §3`.
    #[must_use]
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Piece => " each",
            Self::Kilogrammes => "/kg",
            Self::Litres => "/l",
            Self::SqMetres => "/m\u{b2}",
            Self::Metres => "m",
        }
    }
}

/// One entry in the unit-conversion table: the unit text (case-folded) maps
/// to the `Unit` it denotes and the multiplicative factor to apply to the
/// parsed price (e.g. `"g"` -> `(Kilogrammes, 1/1000)` because a
/// per-gramme price needs scaling up to a per-kilogramme price).
///
/// Table content and factors are lifted directly from
/// `original_source/common/product.cpp::UNIT_CONVERSIONS`.
const UNIT_CONVERSIONS: &[(&str, Unit, f64)] = &[
    ("kg", Unit::Kilogrammes, 1.0),
    ("g", Unit::Kilogrammes, 1000.0),
    ("75cl", Unit::Litres, 1.0 / 0.75),
    ("70cl", Unit::Litres, 1.0 / 0.7),
    ("l", Unit::Litres, 1.0),
    ("litre", Unit::Litres, 1.0),
    ("ml", Unit::Litres, 1000.0),
    ("m\u{b2}", Unit::SqMetres, 1.0),
    ("each", Unit::Piece, 1.0),
    ("100sht", Unit::Piece, 0.01),
    ("metre", Unit::Metres, 1.0),
    // `Metres`'s display suffix ("m") has no separator before it, unlike
    // every other unit; this extra key lets `PricePU::parse` recover a unit
    // it has just formatted, satisfying the round-trip property in
    // spec.md §8 without changing the table's meaning for scraped input
    // (a real page would use "metre", never the bare suffix).
    ("m", Unit::Metres, 1.0),
];

/// Known separators between the price and unit portions of a `PricePU`
/// string, tried longest-first so `" per "` wins over a bare `" "`.
const SEPARATORS: &[&str] = &[" per ", "/", " "];

/// A price expressed per unit (e.g. `€2.50/kg`).
#[derive(Debug, Clone, Copy, PartialEq, Hash)]
pub struct PricePU {
    /// The underlying price.
    pub price: Price,
    /// The unit the price is expressed in terms of.
    pub unit: Unit,
}

impl PricePU {
    /// Construct directly from a price and unit.
    #[must_use]
    pub const fn new(price: Price, unit: Unit) -> Self {
        Self { price, unit }
    }

    /// Parse forms like `"€2.50/kg"`, `"€2.50 per kg"`, `"€3.00/75cl"`.
    ///
    /// Separators are tried longest-first; the unit text after the
    /// separator is case-folded and looked up in [`UNIT_CONVERSIONS`].
    pub fn parse(s: &str) -> Result<Self, PricePuParseError> {
        if s.is_empty() {
            return Err(PricePuParseError::Empty);
        }

        // Remember the first separator that actually split the string, even
        // if its unit text doesn't match the conversion table: that makes
        // "found a separator, but the unit after it is unrecognised" a
        // distinct, reportable case from "no separator at all".
        let mut unrecognised_unit: Option<String> = None;

        for sep in SEPARATORS {
            let Some(idx) = s.find(sep) else { continue };
            let price_part = &s[..idx];
            let unit_part = &s[idx + sep.len()..];

            let lowered = unit_part.to_lowercase();
            let Some(&(_, unit, factor)) =
                UNIT_CONVERSIONS.iter().find(|(text, _, _)| *text == lowered)
            else {
                unrecognised_unit.get_or_insert_with(|| unit_part.to_owned());
                continue;
            };

            let price = Price::parse(price_part)
                .map_err(|e| PricePuParseError::InvalidPrice(s.to_owned(), e))?;

            return Ok(Self {
                price: price.scale(factor),
                unit,
            });
        }

        // No listed separator appears: a handful of unit suffixes (e.g.
        // `Metres`'s bare "m") are glued directly onto the price with no
        // separating character at all. Fall back to matching the longest
        // conversion-table key that the string ends with.
        let lowered = s.to_lowercase();
        let mut by_len: Vec<&(&str, Unit, f64)> = UNIT_CONVERSIONS.iter().collect();
        by_len.sort_by_key(|(text, _, _)| std::cmp::Reverse(text.len()));
        for (text, unit, factor) in by_len {
            if lowered.len() > text.len() && lowered.ends_with(text) {
                let price_part = &s[..s.len() - text.len()];
                let price = Price::parse(price_part)
                    .map_err(|e| PricePuParseError::InvalidPrice(s.to_owned(), e))?;
                return Ok(Self {
                    price: price.scale(*factor),
                    unit: *unit,
                });
            }
        }

        match unrecognised_unit {
            Some(unit_text) => Err(PricePuParseError::UnknownUnit(unit_text)),
            None => Err(PricePuParseError::NoSeparator(s.to_owned())),
        }
    }

    /// Parse, logging at `WARNING` and returning `None` on failure, per
    /// `spec.md §7`/§8 ("PricePU with unknown unit text ⇒ returns None,
    /// WARNING logged").
    pub fn from_str_logged(s: &str) -> Option<Self> {
        match Self::parse(s) {
            Ok(pu) => Some(pu),
            Err(e) => {
                tracing::warn!(input = %s, error = %e, "failed to parse price-per-unit");
                None
            }
        }
    }
}

impl fmt::Display for PricePU {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.price, self.unit.suffix())
    }
}

impl PartialOrd for PricePU {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.unit != other.unit {
            return None;
        }
        self.price.partial_cmp(&other.price)
    }
}

impl Serialize for PricePU {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.unit)?;
        seq.serialize_element(&self.price)?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for PricePU {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct PricePuVisitor;

        impl<'de> Visitor<'de> for PricePuVisitor {
            type Value = PricePU;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a two-element [unit, price] sequence")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let unit = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(0, &self))?;
                let price = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::invalid_length(1, &self))?;
                Ok(PricePU { unit, price })
            }
        }

        deserializer.deserialize_seq(PricePuVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Currency;

    #[test]
    fn parses_per_kg() {
        let pu = PricePU::parse("\u{20ac}2.50/kg").unwrap();
        assert_eq!(pu, PricePU::new(Price::new(Currency::Eur, 250), Unit::Kilogrammes));
        assert_eq!(pu.to_string(), "\u{20ac}2.50/kg");
    }

    #[test]
    fn parses_per_75cl_with_factor() {
        let pu = PricePU::parse("\u{20ac}3.00/75cl").unwrap();
        assert_eq!(pu.unit, Unit::Litres);
        // 300 * (1/0.75) = 400
        assert_eq!(pu.price.value, 400);
    }

    #[test]
    fn parses_per_separator_form() {
        let pu = PricePU::parse("\u{20ac}2.50 per kg").unwrap();
        assert_eq!(pu.unit, Unit::Kilogrammes);
    }

    #[test]
    fn unknown_unit_is_none_and_logs() {
        assert!(PricePU::from_str_logged("\u{20ac}2.50/parsecs").is_none());
    }

    #[test]
    fn unknown_unit_after_a_recognised_separator_is_distinguished_from_no_separator() {
        let err = PricePU::parse("\u{20ac}2.50/parsecs").unwrap_err();
        assert_eq!(err, PricePuParseError::UnknownUnit("parsecs".to_owned()));

        let err = PricePU::parse("garbledpricestring").unwrap_err();
        assert!(matches!(err, PricePuParseError::NoSeparator(_)));
    }

    #[test]
    fn ordering_requires_matching_units() {
        let a = PricePU::new(Price::new(Currency::Eur, 100), Unit::Kilogrammes);
        let b = PricePU::new(Price::new(Currency::Eur, 100), Unit::Litres);
        assert_eq!(a.partial_cmp(&b), None);
    }

    #[test]
    fn json_roundtrip() {
        let pu = PricePU::new(Price::new(Currency::Eur, 250), Unit::Kilogrammes);
        let json = serde_json::to_string(&pu).unwrap();
        let back: PricePU = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pu);
    }

    #[test]
    fn round_trips_each_real_unit() {
        for (unit, text) in [
            (Unit::Kilogrammes, "kg"),
            (Unit::Litres, "l"),
            (Unit::Piece, "each"),
            (Unit::Metres, "metre"),
        ] {
            let input = format!("\u{20ac}4.00/{text}");
            let parsed = PricePU::parse(&input).unwrap();
            assert_eq!(parsed.unit, unit);
            let reparsed = PricePU::parse(&parsed.to_string());
            // Re-display always uses `/` or no separator, not the original
            // alias, so just check the unit and price survive intact.
            assert_eq!(reparsed.unwrap().price, parsed.price);
        }
    }
}
