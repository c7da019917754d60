//! Allocation join
//!
//! Attaches profile, group, taxonomy and component codes to every record.

use crate::models::{
    AllocatedRecord, CatalogProfile, ComponentLibrary, ObjectPartGroup, SumCheckedRecord,
};
use crate::services::TaxonomyLibrary;
use std::collections::HashMap;
use thiserror::Error;

/// A record references something an earlier stage did not produce
#[derive(Debug, Error)]
pub enum JoinError {
    #[error("No catalog profile for {asset_class} at location {location}")]
    MissingProfile { asset_class: String, location: String },

    #[error("No object-part group for {asset_class} item {item} at {location}")]
    MissingGroup {
        asset_class: String,
        location: String,
        item: String,
    },

    #[error("{kind} value not in library: {value}")]
    MissingTaxonomy { kind: &'static str, value: String },

    #[error("No component code for {0}")]
    MissingComponent(String),
}

/// Lookup tables produced by earlier stages
pub struct AllocationInputs<'a> {
    pub profiles: &'a [CatalogProfile],
    pub groups: &'a [ObjectPartGroup],
    pub mechanisms: &'a TaxonomyLibrary,
    pub causes: &'a TaxonomyLibrary,
    pub components: &'a ComponentLibrary,
}

/// Joins codes onto records
#[derive(Debug, Default)]
pub struct AllocationJoiner;

impl AllocationJoiner {
    pub fn new() -> Self {
        Self
    }

    /// One allocated record per input record, in input order
    pub fn join(
        &self,
        records: &[SumCheckedRecord],
        inputs: &AllocationInputs<'_>,
    ) -> Result<Vec<AllocatedRecord>, JoinError> {
        let profiles: HashMap<(&str, &str, &str), &CatalogProfile> = inputs
            .profiles
            .iter()
            .map(|p| {
                (
                    (p.asset_class.as_str(), p.location_id.as_str(), p.location_name.as_str()),
                    p,
                )
            })
            .collect();
        let groups: HashMap<(&str, &str, &str, &str), &ObjectPartGroup> = inputs
            .groups
            .iter()
            .map(|g| {
                (
                    (
                        g.asset_class.as_str(),
                        g.location_id.as_str(),
                        g.location_name.as_str(),
                        g.item.as_str(),
                    ),
                    g,
                )
            })
            .collect();

        let mut allocated = Vec::with_capacity(records.len());
        for checked in records {
            let record = &checked.record;

            let location = (
                record.asset_class.as_str(),
                record.location_id.as_str(),
                record.location_name.as_str(),
            );
            let profile = profiles
                .get(&location)
                .ok_or_else(|| JoinError::MissingProfile {
                    asset_class: record.asset_class.clone(),
                    location: record.location_id.clone(),
                })?;
            let group = groups
                .get(&(location.0, location.1, location.2, record.item.as_str()))
                .ok_or_else(|| JoinError::MissingGroup {
                    asset_class: record.asset_class.clone(),
                    location: record.location_id.clone(),
                    item: record.item.clone(),
                })?;
            let mechanism = inputs.mechanisms.find(&record.mechanism).ok_or_else(|| {
                JoinError::MissingTaxonomy {
                    kind: "mechanism",
                    value: record.mechanism.clone(),
                }
            })?;
            let cause = inputs
                .causes
                .find(&record.cause)
                .ok_or_else(|| JoinError::MissingTaxonomy {
                    kind: "cause",
                    value: record.cause.clone(),
                })?;
            let component = inputs
                .components
                .find(&record.component, checked.sum_check)
                .ok_or_else(|| JoinError::MissingComponent(record.component.clone()))?;

            allocated.push(AllocatedRecord {
                record: record.clone(),
                profile_code: profile.profile_code.clone(),
                group_code: group.group_code.clone(),
                mechanism_code: mechanism.code.clone(),
                mechanism_name: mechanism.name.clone(),
                cause_code: cause.code.clone(),
                cause_name: cause.name.clone(),
                sum_check: checked.sum_check,
                component_code: component.code.clone(),
                damage_group_code: component.damage_group_code.clone(),
                cause_group_code: component.cause_group_code.clone(),
            });
        }

        tracing::debug!(records = allocated.len(), "Allocated codes to records");
        Ok(allocated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ComponentCodeEntry, LibraryKind, RawRecord, SumCheck};
    use crate::services::{Aggregator, GroupAssigner, ProfileAssigner};

    fn record(component: &str, mechanism: &str) -> RawRecord {
        RawRecord {
            asset_class: "CRGY".to_string(),
            location_id: "ABC-001".to_string(),
            location_name: "Crusher 1".to_string(),
            item: "Pump".to_string(),
            component: component.to_string(),
            mechanism: mechanism.to_string(),
            cause: "Age".to_string(),
        }
    }

    struct Fixture {
        checked: Vec<SumCheckedRecord>,
        profiles: Vec<CatalogProfile>,
        groups: Vec<ObjectPartGroup>,
        mechanisms: TaxonomyLibrary,
        causes: TaxonomyLibrary,
        components: ComponentLibrary,
    }

    fn fixture(records: &[RawRecord]) -> Fixture {
        let profiles = ProfileAssigner::new().assign(records);
        let groups = GroupAssigner::new().assign(records, &profiles).unwrap();
        let mut mechanisms = TaxonomyLibrary::new(LibraryKind::Mechanism);
        mechanisms.create_entry("Wear");
        let mut causes = TaxonomyLibrary::new(LibraryKind::Cause);
        causes.create_entry("Age");
        let checked = Aggregator::new().aggregate(records, &mechanisms, &causes);
        let mut components = ComponentLibrary::default();
        components.entries.push(ComponentCodeEntry::new("Seal", checked[0].sum_check, "SEAL"));
        Fixture {
            checked,
            profiles,
            groups,
            mechanisms,
            causes,
            components,
        }
    }

    #[test]
    fn test_join_attaches_every_code() {
        let records = vec![record("Seal", "Wear")];
        let f = fixture(&records);
        let inputs = AllocationInputs {
            profiles: &f.profiles,
            groups: &f.groups,
            mechanisms: &f.mechanisms,
            causes: &f.causes,
            components: &f.components,
        };

        let allocated = AllocationJoiner::new().join(&f.checked, &inputs).unwrap();

        let row = &allocated[0];
        assert_eq!(row.profile_code, "CRGY0101");
        assert_eq!(row.group_code, "CRGY010A");
        assert_eq!(row.mechanism_code, "D001");
        assert_eq!(row.cause_code, "C001");
        assert_eq!(row.component_code, "SEAL");
        assert_eq!(row.damage_group_code, "DSEAL");
        assert_eq!(row.cause_group_code, "CSEAL");
    }

    #[test]
    fn test_component_lookup_uses_sum_check() {
        let records = vec![record("Seal", "Wear")];
        let mut f = fixture(&records);
        f.components.entries[0].sum_check = SumCheck { mechanism: 1, cause: 1 };
        let inputs = AllocationInputs {
            profiles: &f.profiles,
            groups: &f.groups,
            mechanisms: &f.mechanisms,
            causes: &f.causes,
            components: &f.components,
        };

        let result = AllocationJoiner::new().join(&f.checked, &inputs);

        assert!(matches!(result, Err(JoinError::MissingComponent(name)) if name == "Seal"));
    }

    #[test]
    fn test_unknown_mechanism_is_an_error() {
        let records = vec![record("Seal", "Corrosion")];
        let f = fixture(&records);
        let inputs = AllocationInputs {
            profiles: &f.profiles,
            groups: &f.groups,
            mechanisms: &f.mechanisms,
            causes: &f.causes,
            components: &f.components,
        };

        let result = AllocationJoiner::new().join(&f.checked, &inputs);

        assert!(matches!(result, Err(JoinError::MissingTaxonomy { kind: "mechanism", .. })));
    }

    #[test]
    fn test_each_asset_class_gets_its_own_codes_at_a_shared_location() {
        let mut pumps = record("Seal", "Wear");
        pumps.asset_class = "PMPS".to_string();
        let records = vec![record("Seal", "Wear"), pumps];
        let f = fixture(&records);
        let inputs = AllocationInputs {
            profiles: &f.profiles,
            groups: &f.groups,
            mechanisms: &f.mechanisms,
            causes: &f.causes,
            components: &f.components,
        };

        let allocated = AllocationJoiner::new().join(&f.checked, &inputs).unwrap();

        let codes: Vec<(&str, &str, &str)> = allocated
            .iter()
            .map(|a| (a.record.asset_class.as_str(), a.profile_code.as_str(), a.group_code.as_str()))
            .collect();
        assert_eq!(
            codes,
            vec![("CRGY", "CRGY0101", "CRGY010A"), ("PMPS", "PMPS0102", "PMPS020A")]
        );
    }

    #[test]
    fn test_profile_from_another_asset_class_is_not_borrowed() {
        let records = vec![record("Seal", "Wear")];
        let mut f = fixture(&records);
        for profile in &mut f.profiles {
            profile.asset_class = "PMPS".to_string();
        }
        let inputs = AllocationInputs {
            profiles: &f.profiles,
            groups: &f.groups,
            mechanisms: &f.mechanisms,
            causes: &f.causes,
            components: &f.components,
        };

        let result = AllocationJoiner::new().join(&f.checked, &inputs);

        assert!(matches!(
            result,
            Err(JoinError::MissingProfile { asset_class, .. }) if asset_class == "CRGY"
        ));
    }
}
