//! Sum-check aggregation
//!
//! Joins records to the resolved mechanism and cause libraries and sums
//! the unique summing numbers per (location, item, component) group. Every
//! member of a group carries the same sum-check pair, which downstream
//! stages use to tell apart same-named components in different contexts.

use crate::models::{RawRecord, SumCheck, SumCheckedRecord};
use crate::services::TaxonomyLibrary;
use std::collections::HashMap;

/// Computes sum checks
#[derive(Debug, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Annotate every record with its offsets and its group's sum check
    ///
    /// Output order matches input order.
    pub fn aggregate(
        &self,
        records: &[RawRecord],
        mechanisms: &TaxonomyLibrary,
        causes: &TaxonomyLibrary,
    ) -> Vec<SumCheckedRecord> {
        let numbers: Vec<(u64, u64)> = records
            .iter()
            .map(|r| {
                let mechanism = mechanisms.summing_number(&r.mechanism);
                let cause = causes.summing_number(&r.cause);
                if mechanism == 0 || cause == 0 {
                    tracing::warn!(
                        location = %r.location_id,
                        item = %r.item,
                        component = %r.component,
                        "Record taxonomy value missing from resolved library"
                    );
                }
                (mechanism, cause)
            })
            .collect();

        let mut sums: HashMap<(&str, &str, &str), SumCheck> = HashMap::new();
        for (record, (mechanism, cause)) in records.iter().zip(&numbers) {
            let sum = sums
                .entry(group_key(record))
                .or_insert(SumCheck { mechanism: 0, cause: 0 });
            sum.mechanism += mechanism;
            sum.cause += cause;
        }

        tracing::debug!(records = records.len(), groups = sums.len(), "Computed sum checks");

        records
            .iter()
            .zip(numbers)
            .map(|(record, (mechanism_number, cause_number))| SumCheckedRecord {
                sum_check: sums[&group_key(record)],
                record: record.clone(),
                mechanism_number,
                cause_number,
            })
            .collect()
    }
}

fn group_key(record: &RawRecord) -> (&str, &str, &str) {
    (
        record.location_id.as_str(),
        record.item.as_str(),
        record.component.as_str(),
    )
}
