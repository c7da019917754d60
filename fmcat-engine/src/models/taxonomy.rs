//! Taxonomy library entries

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Which growing taxonomy library an entry or conflict belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    /// Failure mechanisms (damage codes)
    Mechanism,
    /// Failure causes
    Cause,
}

impl LibraryKind {
    /// Letter prefixed to every code in the library
    pub fn code_prefix(self) -> char {
        match self {
            LibraryKind::Mechanism => 'D',
            LibraryKind::Cause => 'C',
        }
    }

    /// Base of the unique summing numbers
    pub fn base_offset(self) -> u64 {
        match self {
            LibraryKind::Mechanism => 100_000,
            LibraryKind::Cause => 200_000,
        }
    }

    /// Persistence key of the library
    pub fn store_key(self) -> &'static str {
        match self {
            LibraryKind::Mechanism => crate::db::MECHANISM_LIBRARY_KEY,
            LibraryKind::Cause => crate::db::CAUSE_LIBRARY_KEY,
        }
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryKind::Mechanism => f.write_str("mechanism"),
            LibraryKind::Cause => f.write_str("cause"),
        }
    }
}

/// Canonical taxonomy value
///
/// Index and code are unique and monotonic within a library. Entries are
/// never removed automatically; only their alias set grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntry {
    pub name: String,
    /// Accepted alternative spellings, seeded with the name itself
    pub similarities: BTreeSet<String>,
    /// 1-based position in the library
    pub index: usize,
    /// Prefixed code, e.g. "D001"
    pub code: String,
    /// Library base offset + index; additive checksum seed
    pub unique_summing_number: u64,
}

impl TaxonomyEntry {
    /// True if `value` is the canonical name or an accepted alias
    pub fn accepts(&self, value: &str) -> bool {
        self.name == value || self.similarities.contains(value)
    }
}
