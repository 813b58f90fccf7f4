#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Crime-type taxonomy for the state/district incidence dataset.
//!
//! The dataset tracks exactly six incident categories, each stored in its
//! own column. The column headers are part of the store format and are
//! matched case-sensitively, so [`CrimeType`] round-trips through those
//! exact strings.

use std::collections::BTreeMap;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString, IntoStaticStr};

/// One of the six tracked incident categories.
///
/// The `Display`/`FromStr` representation is the exact column header used
/// in the backing store.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    IntoStaticStr,
)]
pub enum CrimeType {
    /// Rape
    #[serde(rename = "Rape")]
    #[strum(serialize = "Rape")]
    Rape,
    /// Kidnapping and abduction of women and girls
    #[serde(rename = "Kidnapping and Abduction")]
    #[strum(serialize = "Kidnapping and Abduction")]
    KidnappingAndAbduction,
    /// Dowry deaths
    #[serde(rename = "Dowry Deaths")]
    #[strum(serialize = "Dowry Deaths")]
    DowryDeaths,
    /// Assault on women with intent to outrage her modesty
    #[serde(rename = "Assault on women with intent to outrage her modesty")]
    #[strum(serialize = "Assault on women with intent to outrage her modesty")]
    AssaultOnWomen,
    /// Insult to the modesty of women
    #[serde(rename = "Insult to modesty of Women")]
    #[strum(serialize = "Insult to modesty of Women")]
    InsultToModesty,
    /// Cruelty by husband or his relatives
    #[serde(rename = "Cruelty by Husband or his Relatives")]
    #[strum(serialize = "Cruelty by Husband or his Relatives")]
    CrueltyByHusband,
}

impl CrimeType {
    /// Number of tracked crime types.
    pub const COUNT: usize = 6;

    /// Returns all variants in store column order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Rape,
            Self::KidnappingAndAbduction,
            Self::DowryDeaths,
            Self::AssaultOnWomen,
            Self::InsultToModesty,
            Self::CrueltyByHusband,
        ]
    }

    /// Position of this crime type in [`CrimeType::all()`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The exact column header for this crime type.
    #[must_use]
    pub fn column(self) -> &'static str {
        self.into()
    }

    /// Looks up a crime type by its exact column header.
    #[must_use]
    pub fn from_column(column: &str) -> Option<Self> {
        column.parse().ok()
    }
}

/// Incident counts for every [`CrimeType`].
///
/// Serializes as a map keyed by column header. Missing keys deserialize as
/// zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    into = "BTreeMap<CrimeType, u64>",
    from = "BTreeMap<CrimeType, u64>"
)]
pub struct CrimeCounts {
    counts: [u64; CrimeType::COUNT],
}

impl CrimeCounts {
    /// Creates a count vector from values in [`CrimeType::all()`] order.
    #[must_use]
    pub const fn new(counts: [u64; CrimeType::COUNT]) -> Self {
        Self { counts }
    }

    /// Returns the count for one crime type.
    #[must_use]
    pub const fn get(&self, crime: CrimeType) -> u64 {
        self.counts[crime.index()]
    }

    /// Sets the count for one crime type.
    pub const fn set(&mut self, crime: CrimeType, count: u64) {
        self.counts[crime.index()] = count;
    }

    /// Sum across all crime types.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Iterates `(crime, count)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (CrimeType, u64)> + '_ {
        CrimeType::all().iter().map(|c| (*c, self.get(*c)))
    }

    /// Counts as an `f64` feature vector in column order.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_features(&self) -> Vec<f64> {
        self.counts.iter().map(|c| *c as f64).collect()
    }
}

impl Add for CrimeCounts {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for CrimeCounts {
    fn add_assign(&mut self, rhs: Self) {
        for (lhs, rhs) in self.counts.iter_mut().zip(rhs.counts) {
            *lhs = lhs.saturating_add(rhs);
        }
    }
}

impl From<CrimeCounts> for BTreeMap<CrimeType, u64> {
    fn from(value: CrimeCounts) -> Self {
        value.iter().collect()
    }
}

impl From<BTreeMap<CrimeType, u64>> for CrimeCounts {
    fn from(value: BTreeMap<CrimeType, u64>) -> Self {
        let mut counts = Self::default();
        for (crime, count) in value {
            counts.set(crime, count);
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use super::*;

    #[test]
    fn column_names_roundtrip_through_strum() {
        for crime in CrimeType::all() {
            assert_eq!(crime.to_string(), crime.column());
            assert_eq!(CrimeType::from_str(crime.column()).unwrap(), *crime);
            assert_eq!(CrimeType::from_column(crime.column()), Some(*crime));
        }
    }

    #[test]
    fn columns_match_store_headers() {
        let headers: Vec<&str> = CrimeType::all().iter().map(|c| c.column()).collect();
        assert_eq!(
            headers,
            vec![
                "Rape",
                "Kidnapping and Abduction",
                "Dowry Deaths",
                "Assault on women with intent to outrage her modesty",
                "Insult to modesty of Women",
                "Cruelty by Husband or his Relatives",
            ]
        );
        assert_eq!(
            serde_json::to_string(&CrimeType::InsultToModesty).unwrap(),
            "\"Insult to modesty of Women\""
        );
    }

    #[test]
    fn column_lookup_is_case_sensitive() {
        assert!(CrimeType::from_column("rape").is_none());
        assert!(CrimeType::from_str("dowry deaths").is_err());
    }

    #[test]
    fn index_matches_position() {
        for (i, crime) in CrimeType::all().iter().enumerate() {
            assert_eq!(crime.index(), i);
        }
        assert_eq!(CrimeType::all().len(), CrimeType::COUNT);
    }

    #[test]
    fn counts_add_per_column() {
        let a = CrimeCounts::new([1, 2, 3, 4, 5, 6]);
        let b = CrimeCounts::new([10, 0, 0, 0, 0, 1]);
        let sum = a + b;
        assert_eq!(sum.get(CrimeType::Rape), 11);
        assert_eq!(sum.get(CrimeType::CrueltyByHusband), 7);
        assert_eq!(sum.total(), 32);
    }

    #[test]
    fn counts_serialize_as_column_map() {
        let mut counts = CrimeCounts::default();
        counts.set(CrimeType::DowryDeaths, 4);
        let json = serde_json::to_value(counts).unwrap();
        assert_eq!(json["Dowry Deaths"], 4);
        assert_eq!(json["Rape"], 0);

        let back: CrimeCounts = serde_json::from_str(r#"{"Dowry Deaths": 4}"#).unwrap();
        assert_eq!(back, counts);
    }
}
