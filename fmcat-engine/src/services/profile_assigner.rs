//! Catalog profile assignment
//!
//! One profile per unique (asset class, location id, location name),
//! numbered over the unique set sorted by location id.
//!
//! # Algorithm
//! 1. Dedupe records on (asset class, location id, location name),
//!    keeping first-seen order
//! 2. Stable-sort the unique rows by location id
//! 3. Walk once: the variation counter increments whenever the
//!    variation key (text before the first '-') differs from the key of
//!    the immediately preceding row; the location index increments on
//!    every row
//! 4. Profile code = asset class + 2-digit variation + 2-digit index
//!
//! Only the previous row is compared, so a key that reappears after a
//! different key counts as a new variation.

use crate::models::{CatalogProfile, RawRecord};
use crate::utils::pad2;
use std::collections::HashSet;

/// Assigns catalog profiles
#[derive(Debug, Default)]
pub struct ProfileAssigner;

impl ProfileAssigner {
    pub fn new() -> Self {
        Self
    }

    /// Assign profiles for every unique location row
    pub fn assign(&self, records: &[RawRecord]) -> Vec<CatalogProfile> {
        let mut seen = HashSet::new();
        let mut unique: Vec<(&str, &str, &str)> = records
            .iter()
            .map(|r| (r.asset_class.as_str(), r.location_id.as_str(), r.location_name.as_str()))
            .filter(|key| seen.insert(*key))
            .collect();

        unique.sort_by(|a, b| a.1.cmp(b.1));

        let mut profiles = Vec::with_capacity(unique.len());
        let mut variation = 0usize;
        let mut previous_key: Option<&str> = None;

        for (position, (asset_class, location_id, location_name)) in unique.into_iter().enumerate() {
            let key = variation_key(location_id);
            if previous_key != Some(key) {
                variation += 1;
            }
            previous_key = Some(key);

            let location_index = position + 1;
            profiles.push(CatalogProfile {
                asset_class: asset_class.to_string(),
                location_id: location_id.to_string(),
                location_name: location_name.to_string(),
                variation_key: key.to_string(),
                variation_number: variation,
                location_index,
                profile_code: format!("{}{}{}", asset_class, pad2(variation), pad2(location_index)),
            });
        }

        tracing::debug!(profiles = profiles.len(), variations = variation, "Assigned catalog profiles");

        profiles
    }
}

/// Text before the first '-' (the whole id when there is none)
pub fn variation_key(location_id: &str) -> &str {
    location_id.split('-').next().unwrap_or(location_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(asset: &str, loc: &str, name: &str) -> RawRecord {
        RawRecord {
            asset_class: asset.to_string(),
            location_id: loc.to_string(),
            location_name: name.to_string(),
            item: "Pump".to_string(),
            component: "Seal".to_string(),
            mechanism: "Wear".to_string(),
            cause: "Age".to_string(),
        }
    }

    #[test]
    fn test_same_variation_prefix() {
        let records = vec![
            record("CRGY", "ABC-001", "Plant A1"),
            record("CRGY", "ABC-002", "Plant A2"),
        ];
        let profiles = ProfileAssigner::new().assign(&records);

        let codes: Vec<&str> = profiles.iter().map(|p| p.profile_code.as_str()).collect();
        assert_eq!(codes, vec!["CRGY0101", "CRGY0102"]);
    }

    #[test]
    fn test_duplicates_collapse_and_sort_by_location() {
        let records = vec![
            record("CRGY", "XYZ-001", "Plant X"),
            record("CRGY", "ABC-001", "Plant A"),
            record("CRGY", "XYZ-001", "Plant X"),
        ];
        let profiles = ProfileAssigner::new().assign(&records);

        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].location_id, "ABC-001");
        assert_eq!(profiles[0].profile_code, "CRGY0101");
        assert_eq!(profiles[1].profile_code, "CRGY0202");
    }

    #[test]
    fn test_codes_unique_per_location_row() {
        let records = vec![
            record("CRGY", "A-1", "One"),
            record("CRGY", "A-1", "One bis"),
            record("PMPS", "A-1", "One"),
            record("CRGY", "B-1", "Two"),
        ];
        let profiles = ProfileAssigner::new().assign(&records);
        let codes: HashSet<&str> = profiles.iter().map(|p| p.profile_code.as_str()).collect();
        assert_eq!(codes.len(), profiles.len());
        assert_eq!(profiles.len(), 4);
    }

    #[test]
    fn test_adjacent_only_variation_counting() {
        let records = vec![
            record("CR", "A-1", "a1"),
            record("CR", "A1-1", "a11"),
            record("CR", "A-2", "a2"),
        ];
        let profiles = ProfileAssigner::new().assign(&records);

        // Lexicographic order: "A-1" < "A-2" < "A1-1"
        let keys: Vec<(&str, usize)> = profiles
            .iter()
            .map(|p| (p.location_id.as_str(), p.variation_number))
            .collect();
        assert_eq!(keys, vec![("A-1", 1), ("A-2", 1), ("A1-1", 2)]);
    }

    #[test]
    fn test_reappearing_key_increments_again() {
        // "A,1" sorts between "A" and "A-1" (',' < '-'), splitting key "A"
        let records = vec![
            record("CR", "A-1", "a1"),
            record("CR", "A,1", "comma"),
            record("CR", "A", "bare"),
        ];
        let profiles = ProfileAssigner::new().assign(&records);

        let keys: Vec<(&str, usize)> = profiles
            .iter()
            .map(|p| (p.location_id.as_str(), p.variation_number))
            .collect();
        assert_eq!(keys, vec![("A", 1), ("A,1", 2), ("A-1", 3)]);
        assert_eq!(profiles[2].profile_code, "CR0303");
    }

    #[test]
    fn test_variation_key() {
        assert_eq!(variation_key("ABC-001-X"), "ABC");
        assert_eq!(variation_key("PLANT"), "PLANT");
    }
}
