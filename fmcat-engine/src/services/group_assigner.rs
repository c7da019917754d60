//! Object-part group assignment
//!
//! One group per unique (asset class, location, maintainable item).
//! The alpha index restarts at 1 for every location and increments when
//! the previous sorted row shares the location but names a different item.

use crate::models::{CatalogProfile, ObjectPartGroup, RawRecord};
use crate::utils::alpha_code;
use crate::utils::numbering::suffix;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Group assignment errors
#[derive(Debug, Error)]
pub enum GroupError {
    /// No catalog profile exists for a record's asset class and location
    #[error("No catalog profile for {asset_class} at location {location}")]
    MissingProfile { asset_class: String, location: String },

    /// A location holds more items than two-letter alpha codes can number
    #[error("Location {location} needs alpha index {index}, beyond ZZ")]
    AlphaOverflow { location: String, index: usize },
}

/// Assigns object-part groups
#[derive(Debug, Default)]
pub struct GroupAssigner;

impl GroupAssigner {
    pub fn new() -> Self {
        Self
    }

    /// Assign groups using the profiles of the same record set
    pub fn assign(
        &self,
        records: &[RawRecord],
        profiles: &[CatalogProfile],
    ) -> Result<Vec<ObjectPartGroup>, GroupError> {
        let by_location: HashMap<(&str, &str, &str), &CatalogProfile> = profiles
            .iter()
            .map(|p| {
                (
                    (p.asset_class.as_str(), p.location_id.as_str(), p.location_name.as_str()),
                    p,
                )
            })
            .collect();

        let mut seen = HashSet::new();
        let mut unique: Vec<GroupKey<'_>> = records
            .iter()
            .map(|r| GroupKey {
                asset_class: r.asset_class.as_str(),
                location_id: r.location_id.as_str(),
                location_name: r.location_name.as_str(),
                item: r.item.as_str(),
            })
            .filter(|key| seen.insert(*key))
            .collect();

        unique.sort_by(|a, b| {
            a.location_id
                .cmp(b.location_id)
                .then_with(|| a.item.cmp(b.item))
                .then_with(|| a.asset_class.cmp(b.asset_class))
                .then_with(|| a.location_name.cmp(b.location_name))
        });

        let mut groups = Vec::with_capacity(unique.len());
        let mut alpha_index = 0usize;
        let mut previous: Option<(&str, &str)> = None;

        for key in unique {
            alpha_index = match previous {
                Some((prev_location, prev_item)) if prev_location == key.location_id => {
                    if prev_item != key.item {
                        alpha_index + 1
                    } else {
                        alpha_index
                    }
                }
                _ => 1,
            };
            previous = Some((key.location_id, key.item));

            let profile = by_location
                .get(&(key.asset_class, key.location_id, key.location_name))
                .ok_or_else(|| GroupError::MissingProfile {
                    asset_class: key.asset_class.to_string(),
                    location: key.location_id.to_string(),
                })?;

            let alpha = alpha_code(alpha_index).ok_or_else(|| GroupError::AlphaOverflow {
                location: key.location_id.to_string(),
                index: alpha_index,
            })?;
            groups.push(ObjectPartGroup {
                asset_class: key.asset_class.to_string(),
                location_id: key.location_id.to_string(),
                location_name: key.location_name.to_string(),
                item: key.item.to_string(),
                alpha_index,
                group_code: format!("{}{}{}", key.asset_class, suffix(&profile.profile_code, 2), alpha),
                alpha_code: alpha,
            });
        }

        tracing::debug!(groups = groups.len(), "Assigned object-part groups");

        Ok(groups)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct GroupKey<'a> {
    asset_class: &'a str,
    location_id: &'a str,
    location_name: &'a str,
    item: &'a str,
}
