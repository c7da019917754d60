//! Raw failure records and the per-record stage outputs derived from them

use serde::{Deserialize, Serialize};

/// One equipment-failure record as delivered by ingestion
///
/// All fields are pre-validated non-empty. Records are never mutated;
/// later stages wrap them instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawRecord {
    pub asset_class: String,
    pub location_id: String,
    pub location_name: String,
    /// Maintainable item name
    pub item: String,
    pub component: String,
    /// Failure mechanism (damage) text
    pub mechanism: String,
    /// Failure cause text
    pub cause: String,
}

/// Aggregate taxonomy checksum pair of a (location, item, component) group
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SumCheck {
    pub mechanism: u64,
    pub cause: u64,
}

/// Record annotated with its taxonomy offsets and its group's sum check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SumCheckedRecord {
    pub record: RawRecord,
    /// Unique summing number of the record's mechanism (0 if unmatched)
    pub mechanism_number: u64,
    /// Unique summing number of the record's cause (0 if unmatched)
    pub cause_number: u64,
    pub sum_check: SumCheck,
}

/// Record with every code the catalog views need
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocatedRecord {
    pub record: RawRecord,
    pub profile_code: String,
    pub group_code: String,
    pub mechanism_code: String,
    /// Canonical library name for the record's mechanism
    pub mechanism_name: String,
    pub cause_code: String,
    /// Canonical library name for the record's cause
    pub cause_name: String,
    pub sum_check: SumCheck,
    pub component_code: String,
    pub damage_group_code: String,
    pub cause_group_code: String,
}
