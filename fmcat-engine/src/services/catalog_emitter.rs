//! Catalog views and load-sheet merge
//!
//! Three views are derived from allocated records:
//! - **B** (object parts): code group = object-part group, code = component code
//! - **C** (damage): code group = component damage group, code = mechanism code
//! - **5** (cause): code group = component cause group, code = cause code
//!
//! The merged load sheet is sorted by (location, naming key, catalog order)
//! and holds no two rows with identical visible fields.

use crate::models::{AllocatedRecord, CatalogProfile, CatalogType, LoadsheetRow};
use std::collections::{HashMap, HashSet};

/// Emits catalog rows
#[derive(Debug, Default)]
pub struct CatalogEmitter;

impl CatalogEmitter {
    pub fn new() -> Self {
        Self
    }

    /// Catalog B rows, one per record
    pub fn item_catalog(&self, records: &[AllocatedRecord], profiles: &[CatalogProfile]) -> Vec<LoadsheetRow> {
        let descriptions = profile_descriptions(profiles);
        records
            .iter()
            .map(|r| {
                row(
                    r,
                    &descriptions,
                    CatalogType::ObjectPart,
                    &r.group_code,
                    &r.component_code,
                    &r.record.item,
                    &r.record.component,
                )
            })
            .collect()
    }

    /// Catalog C rows, one per record
    pub fn damage_catalog(&self, records: &[AllocatedRecord], profiles: &[CatalogProfile]) -> Vec<LoadsheetRow> {
        let descriptions = profile_descriptions(profiles);
        records
            .iter()
            .map(|r| {
                row(
                    r,
                    &descriptions,
                    CatalogType::Damage,
                    &r.damage_group_code,
                    &r.mechanism_code,
                    &r.record.component,
                    &r.mechanism_name,
                )
            })
            .collect()
    }

    /// Catalog 5 rows, one per record
    pub fn cause_catalog(&self, records: &[AllocatedRecord], profiles: &[CatalogProfile]) -> Vec<LoadsheetRow> {
        let descriptions = profile_descriptions(profiles);
        records
            .iter()
            .map(|r| {
                row(
                    r,
                    &descriptions,
                    CatalogType::Cause,
                    &r.cause_group_code,
                    &r.cause_code,
                    &r.record.component,
                    &r.cause_name,
                )
            })
            .collect()
    }

    /// Merge views into the final load sheet
    pub fn merge(&self, views: impl IntoIterator<Item = Vec<LoadsheetRow>>) -> Vec<LoadsheetRow> {
        let mut rows: Vec<LoadsheetRow> = views.into_iter().flatten().collect();
        let total = rows.len();

        rows.sort_by(|a, b| {
            a.location
                .cmp(&b.location)
                .then_with(|| a.naming_key.cmp(&b.naming_key))
                .then_with(|| a.catalog_order.cmp(&b.catalog_order))
        });

        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(rows.len());
        for row in &rows {
            if seen.insert(row.visible_fields()) {
                unique.push(row.clone());
            }
        }

        tracing::debug!(rows = unique.len(), duplicates = total - unique.len(), "Merged load sheet");
        unique
    }
}

fn profile_descriptions(profiles: &[CatalogProfile]) -> HashMap<&str, &str> {
    profiles
        .iter()
        .map(|p| (p.profile_code.as_str(), p.location_name.as_str()))
        .collect()
}

fn row(
    record: &AllocatedRecord,
    descriptions: &HashMap<&str, &str>,
    catalog: CatalogType,
    code_group: &str,
    code: &str,
    code_group_description: &str,
    code_description: &str,
) -> LoadsheetRow {
    let profile_description = descriptions
        .get(record.profile_code.as_str())
        .copied()
        .unwrap_or(record.record.location_name.as_str());

    LoadsheetRow {
        location: record.record.location_id.clone(),
        profile_code: record.profile_code.clone(),
        profile_description: profile_description.to_string(),
        catalog,
        code_group: code_group.to_string(),
        code: code.to_string(),
        code_group_description: code_group_description.to_string(),
        code_description: code_description.to_string(),
        naming_key: format!("{}|{}", record.record.item, record.record.component),
        catalog_order: catalog.sort_order(),
    }
}
