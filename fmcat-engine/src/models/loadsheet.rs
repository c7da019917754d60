//! Final load-sheet rows

use serde::{Deserialize, Serialize};
use std::fmt;

/// Catalog discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CatalogType {
    /// Object parts
    #[serde(rename = "B")]
    ObjectPart,
    /// Damage (failure mechanism)
    #[serde(rename = "C")]
    Damage,
    /// Cause
    #[serde(rename = "5")]
    Cause,
}

impl CatalogType {
    /// Sort position within one naming key: B=1, C=2, 5=3
    pub fn sort_order(self) -> u8 {
        match self {
            CatalogType::ObjectPart => 1,
            CatalogType::Damage => 2,
            CatalogType::Cause => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CatalogType::ObjectPart => "B",
            CatalogType::Damage => "C",
            CatalogType::Cause => "5",
        }
    }
}

impl fmt::Display for CatalogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One load-sheet line: eight visible fields plus two sort keys
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoadsheetRow {
    pub location: String,
    pub profile_code: String,
    pub profile_description: String,
    pub catalog: CatalogType,
    pub code_group: String,
    pub code: String,
    pub code_group_description: String,
    pub code_description: String,
    /// Composite "item|component" key
    pub naming_key: String,
    pub catalog_order: u8,
}

impl LoadsheetRow {
    /// The eight visible fields, used for deduplication
    pub fn visible_fields(&self) -> (&str, &str, &str, CatalogType, &str, &str, &str, &str) {
        (
            &self.location,
            &self.profile_code,
            &self.profile_description,
            self.catalog,
            &self.code_group,
            &self.code,
            &self.code_group_description,
            &self.code_description,
        )
    }
}
