//! [`StoreID`] and [`StoreSelection`].
//!
//! `StoreID` carries the retailers seen in `original_source` (SuperValu,
//! Lidl, Tesco, Aldi, Dunnes Stores — the last from
//! `original_source/webserver/main.cpp::GetStoreName`); `StoreSelection` is
//! the bit-set redesign called for in `spec.md §9` ("assumes ≤ 64
//! retailers"), replacing the original's `std::vector<StoreID>`.

use serde::{Deserialize, Serialize};

/// A recognized retailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StoreID {
    /// SuperValu (Ireland), HTML-scraped.
    SuperValu,
    /// Lidl, HTML-scraped.
    Lidl,
    /// Tesco, HTML-scraped.
    Tesco,
    /// Dunnes Stores, HTML-scraped.
    DunnesStores,
    /// Aldi, JSON API.
    Aldi,
}

/// All defined [`StoreID`] variants, in bit-ascending order. Keep this in
/// sync with the enum: `StoreSelection` relies on `StoreID::bit()` being a
/// bijection onto `0..ALL.len()`.
pub const ALL_STORES: [StoreID; 5] =
    [StoreID::SuperValu, StoreID::Lidl, StoreID::Tesco, StoreID::DunnesStores, StoreID::Aldi];

impl StoreID {
    /// The bit position this store occupies in a [`StoreSelection`].
    #[must_use]
    pub const fn bit(self) -> u32 {
        match self {
            Self::SuperValu => 0,
            Self::Lidl => 1,
            Self::Tesco => 2,
            Self::DunnesStores => 3,
            Self::Aldi => 4,
        }
    }

    /// The short prefix this retailer's adapter prepends to native SKUs to
    /// build a globally-unique [`crate::product::Product::id`].
    #[must_use]
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::SuperValu => "SV",
            Self::Lidl => "LI",
            Self::Tesco => "TE",
            Self::DunnesStores => "DU",
            Self::Aldi => "AL",
        }
    }

    const fn from_bit(bit: u32) -> Option<Self> {
        let mut i = 0;
        while i < ALL_STORES.len() {
            if ALL_STORES[i].bit() == bit {
                return Some(ALL_STORES[i]);
            }
            i += 1;
        }
        None
    }
}

/// A set of [`StoreID`]s represented as a bit-field over a `u64`.
///
/// `spec.md §3`/`§9`: supports membership, union, intersection, difference,
/// toggle, ascending iteration, and JSON encoding as the underlying integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct StoreSelection(u64);

impl StoreSelection {
    /// The empty selection.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// A selection containing every defined [`StoreID`].
    #[must_use]
    pub fn all() -> Self {
        ALL_STORES.iter().copied().collect()
    }

    /// A selection containing just `id`.
    #[must_use]
    pub const fn single(id: StoreID) -> Self {
        Self(1 << id.bit())
    }

    /// Build directly from the underlying bit-field (the wire/JSON
    /// representation).
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// The underlying bit-field.
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Whether `id` is a member of this selection.
    #[must_use]
    pub const fn has(self, id: StoreID) -> bool {
        self.0 & (1 << id.bit()) != 0
    }

    /// Whether every member of `other` is also a member of `self`.
    #[must_use]
    pub const fn is_superset_of(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Union: stores in either selection.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Intersection: stores in both selections.
    #[must_use]
    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Set difference: stores in `self` but not in `other`.
    #[must_use]
    pub const fn without(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// Toggle membership of `id`.
    #[must_use]
    pub const fn toggled(self, id: StoreID) -> Self {
        Self(self.0 ^ (1 << id.bit()))
    }

    /// Add `id` to the selection in place.
    pub fn add(&mut self, id: StoreID) {
        self.0 |= 1 << id.bit();
    }

    /// Remove `id` from the selection in place.
    pub fn remove(&mut self, id: StoreID) {
        self.0 &= !(1 << id.bit());
    }

    /// Whether the selection contains no stores.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The number of stores in the selection.
    #[must_use]
    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    /// Iterate over the members, in bit-ascending order.
    pub fn iter(self) -> impl Iterator<Item = StoreID> {
        let bits = self.0;
        (0..u64::BITS).filter(move |b| bits & (1 << b) != 0).filter_map(StoreID::from_bit)
    }
}

impl FromIterator<StoreID> for StoreSelection {
    fn from_iter<T: IntoIterator<Item = StoreID>>(iter: T) -> Self {
        let mut selection = Self::empty();
        for id in iter {
            selection.add(id);
        }
        selection
    }
}

impl IntoIterator for StoreSelection {
    type Item = StoreID;
    type IntoIter = Box<dyn Iterator<Item = StoreID>>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

impl Serialize for StoreSelection {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StoreSelection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_and_add() {
        let mut s = StoreSelection::empty();
        assert!(!s.has(StoreID::Aldi));
        s.add(StoreID::Aldi);
        assert!(s.has(StoreID::Aldi));
    }

    #[test]
    fn without_self_is_empty() {
        let s: StoreSelection = [StoreID::SuperValu, StoreID::Lidl].into_iter().collect();
        assert_eq!(s.without(s), StoreSelection::empty());
    }

    #[test]
    fn union_has_iff_either_has() {
        let s: StoreSelection = [StoreID::SuperValu].into_iter().collect();
        let t: StoreSelection = [StoreID::Lidl].into_iter().collect();
        let u = s.union(t);
        for id in ALL_STORES {
            assert_eq!(u.has(id), s.has(id) || t.has(id));
        }
    }

    #[test]
    fn iteration_is_bit_ascending() {
        let s: StoreSelection = [StoreID::Aldi, StoreID::SuperValu, StoreID::Tesco].into_iter().collect();
        let ids: Vec<_> = s.iter().collect();
        assert_eq!(ids, vec![StoreID::SuperValu, StoreID::Tesco, StoreID::Aldi]);
    }

    #[test]
    fn superset_check() {
        let all: StoreSelection = [StoreID::SuperValu, StoreID::Lidl].into_iter().collect();
        let one: StoreSelection = [StoreID::SuperValu].into_iter().collect();
        assert!(all.is_superset_of(one));
        assert!(!one.is_superset_of(all));
    }

    #[test]
    fn json_roundtrip() {
        let s: StoreSelection = [StoreID::SuperValu, StoreID::Aldi].into_iter().collect();
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(json, s.bits().to_string());
        let back: StoreSelection = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn toggle_flips_membership() {
        let s = StoreSelection::empty().toggled(StoreID::Tesco);
        assert!(s.has(StoreID::Tesco));
        let s = s.toggled(StoreID::Tesco);
        assert!(!s.has(StoreID::Tesco));
    }
}
