//! Catalog profiles and object-part groups

use serde::{Deserialize, Serialize};

/// Hierarchical profile code for one (asset class, location id, location name)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProfile {
    pub asset_class: String,
    pub location_id: String,
    pub location_name: String,
    /// Text before the first '-' of the location id
    pub variation_key: String,
    pub variation_number: usize,
    /// Global 1-based position in the sorted unique sequence
    pub location_index: usize,
    /// asset class + 2-digit variation + 2-digit location index
    pub profile_code: String,
}

/// Object-part group for one (asset class, location, maintainable item)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectPartGroup {
    pub asset_class: String,
    pub location_id: String,
    pub location_name: String,
    pub item: String,
    /// Per-location 1-based sequence
    pub alpha_index: usize,
    /// "0A".."0Z", "AA"..
    pub alpha_code: String,
    /// asset class + last two of the profile code + alpha code
    pub group_code: String,
}
