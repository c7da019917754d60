//! Taxonomy library (failure mechanisms and causes)
//!
//! Append-only store of canonical taxonomy strings guarded by a fuzzy
//! duplicate gate.
//!
//! # Reconciliation
//! For each distinct incoming value (processed in sorted order):
//! 1. Skip if it is an entry's canonical name or accepted alias
//! 2. Rank existing entries by fuzzy distance over name and aliases; if
//!    the best distance is below the threshold, raise a conflict with the
//!    top three candidates and create nothing
//! 3. Otherwise append a new entry
//!
//! Conflicts are settled through [`TaxonomyLibrary::apply_resolution`].

use crate::models::{Conflict, ConflictCandidate, LibraryKind, Resolution, TaxonomyEntry};
use crate::utils::{rank, taxonomy_number};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// Number of candidates carried by a conflict
pub const MAX_CANDIDATES: usize = 3;

/// Default conflict threshold (distance)
pub const DEFAULT_CONFLICT_THRESHOLD: f64 = 0.4;

/// Library errors
#[derive(Debug, Error)]
pub enum LibraryError {
    /// Conflict belongs to the other library
    #[error("Conflict {0} belongs to the {1} library")]
    WrongLibrary(uuid::Uuid, LibraryKind),

    /// Accepted name is not one of the conflict's candidates
    #[error("No {0} candidate named '{1}'")]
    UnknownEntry(LibraryKind, String),

    /// Custom name was blank
    #[error("Custom name for conflict {0} is empty")]
    EmptyCustomName(uuid::Uuid),
}

/// One growing taxonomy library
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyLibrary {
    pub kind: LibraryKind,
    pub entries: Vec<TaxonomyEntry>,
}

impl TaxonomyLibrary {
    pub fn new(kind: LibraryKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry whose name or alias equals `value`
    pub fn find(&self, value: &str) -> Option<&TaxonomyEntry> {
        self.entries.iter().find(|e| e.accepts(value))
    }

    /// Unique summing number for `value`, 0 when not in the library
    pub fn summing_number(&self, value: &str) -> u64 {
        self.find(value).map(|e| e.unique_summing_number).unwrap_or(0)
    }

    /// Reconcile a batch of distinct values against the library
    ///
    /// Values without a close match become new entries immediately; the
    /// returned conflicts list the values that need a decision.
    pub fn reconcile(&mut self, values: &BTreeSet<String>, threshold: f64) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        let mut created = 0usize;

        for value in values {
            if self.find(value).is_some() {
                continue;
            }

            let candidates = self.candidates(value, threshold);
            if !candidates.is_empty() {
                tracing::debug!(
                    library = %self.kind,
                    value = %value,
                    best = %candidates[0].name,
                    similarity = candidates[0].similarity,
                    "Ambiguous taxonomy value"
                );
                conflicts.push(Conflict::new(self.kind, value.clone(), candidates));
                continue;
            }

            self.create_entry(value);
            created += 1;
        }

        tracing::info!(
            library = %self.kind,
            incoming = values.len(),
            created,
            conflicts = conflicts.len(),
            total = self.entries.len(),
            "Reconciled taxonomy library"
        );

        conflicts
    }

    /// Existing entries closer than `threshold`, best first, at most three
    fn candidates(&self, value: &str, threshold: f64) -> Vec<ConflictCandidate> {
        let keys = self.entries.iter().enumerate().flat_map(|(i, entry)| {
            std::iter::once((i, entry.name.as_str()))
                .chain(entry.similarities.iter().map(move |alias| (i, alias.as_str())))
        });

        rank(value, keys)
            .into_iter()
            .filter(|hit| hit.score < threshold)
            .take(MAX_CANDIDATES)
            .map(|hit| {
                let entry = &self.entries[hit.owner];
                ConflictCandidate {
                    name: entry.name.clone(),
                    similarity: hit.similarity(),
                    code: entry.code.clone(),
                }
            })
            .collect()
    }

    /// Append a new entry with the next index
    pub fn create_entry(&mut self, name: &str) -> &TaxonomyEntry {
        let index = self.entries.len() + 1;
        let mut similarities = BTreeSet::new();
        similarities.insert(name.to_string());

        self.entries.push(TaxonomyEntry {
            name: name.to_string(),
            similarities,
            index,
            code: format!("{}{}", self.kind.code_prefix(), taxonomy_number(index)),
            unique_summing_number: self.kind.base_offset() + index as u64,
        });

        let entry = &self.entries[index - 1];
        tracing::debug!(library = %self.kind, name, code = %entry.code, "Created taxonomy entry");
        entry
    }

    /// Apply a decision to a conflict raised by this library
    ///
    /// - Accept: the value becomes an alias of the named entry
    /// - Reject: a new entry is created under the value
    /// - Custom: the custom name is created (or an existing entry reused)
    ///   and the value is added as its alias
    pub fn apply_resolution(
        &mut self,
        conflict: &Conflict,
        resolution: &Resolution,
    ) -> Result<(), LibraryError> {
        if conflict.library != self.kind {
            return Err(LibraryError::WrongLibrary(conflict.id, conflict.library));
        }

        match resolution {
            Resolution::Accept { candidate } => {
                if !conflict.candidates.iter().any(|c| c.name == *candidate) {
                    return Err(LibraryError::UnknownEntry(self.kind, candidate.clone()));
                }
                let entry = self
                    .entries
                    .iter_mut()
                    .find(|e| e.name == *candidate)
                    .ok_or_else(|| LibraryError::UnknownEntry(self.kind, candidate.clone()))?;
                entry.similarities.insert(conflict.value.clone());
            }
            Resolution::Reject => {
                if self.find(&conflict.value).is_none() {
                    self.create_entry(&conflict.value);
                }
            }
            Resolution::Custom { name } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(LibraryError::EmptyCustomName(conflict.id));
                }
                let position = match self.entries.iter().position(|e| e.accepts(name)) {
                    Some(position) => position,
                    None => self.create_entry(name).index - 1,
                };
                self.entries[position]
                    .similarities
                    .insert(conflict.value.clone());
            }
        }

        tracing::info!(
            library = %self.kind,
            value = %conflict.value,
            ?resolution,
            "Applied conflict resolution"
        );

        Ok(())
    }

    /// Codes are unique and indices run 1..=len
    pub fn is_consistent(&self) -> bool {
        let codes: HashSet<&str> = self.entries.iter().map(|e| e.code.as_str()).collect();
        codes.len() == self.entries.len()
            && self.entries.iter().enumerate().all(|(i, e)| e.index == i + 1)
    }
}
