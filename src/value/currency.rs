//! Currency enumeration.
//!
//! Shaped directly after the teacher's `currency::Currency`: a plain enum
//! with hand-rolled `Display`/symbol lookup rather than a derive macro,
//! since the symbol table (and eventually more currencies) isn't a
//! mechanical 1:1 mapping to the variant name.

use serde::{Deserialize, Serialize};

/// A currency in which monetary values are denominated.
///
/// `spec.md §3` defines only `EUR`; the type stays an enum (rather than a
/// unit struct) so a future currency can be added without breaking the
/// `Price` representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// The Euro.
    #[serde(rename = "EUR")]
    Eur,
}

impl Currency {
    /// The textual symbol prefixed onto formatted prices (e.g. `"€"`).
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eur => "\u{20ac}",
        }
    }

    /// The three-letter ISO-ish code used in JSON encoding.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Eur => "EUR",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_and_code() {
        assert_eq!(Currency::Eur.symbol(), "\u{20ac}");
        assert_eq!(Currency::Eur.code(), "EUR");
    }

    #[test]
    fn json_roundtrip() {
        let json = serde_json::to_string(&Currency::Eur).unwrap();
        assert_eq!(json, "\"EUR\"");
        let back: Currency = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Currency::Eur);
    }
}
