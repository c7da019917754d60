//! Fuzzy-match conflicts awaiting an external decision

use super::LibraryKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ranked existing entry similar to a proposed value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictCandidate {
    /// Canonical name of the existing entry
    pub name: String,
    /// Similarity in [0.0, 1.0], 1.0 = identical
    pub similarity: f64,
    /// Existing entry code
    pub code: String,
}

/// Decision submitted for a conflict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Resolution {
    /// Add the proposed value as an alias of the named existing entry
    Accept { candidate: String },
    /// Create a new entry under the proposed value
    Reject,
    /// Create (or reuse) an entry under a caller-supplied name
    Custom { name: String },
}

/// A proposed value too similar to existing entries to be added silently
///
/// Blocks the stage that raised it until resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: Uuid,
    pub library: LibraryKind,
    /// Incoming value that triggered the conflict
    pub value: String,
    /// Up to three closest existing entries, best first
    pub candidates: Vec<ConflictCandidate>,
    /// `None` while unresolved
    #[serde(default)]
    pub resolution: Option<Resolution>,
}

impl Conflict {
    pub fn new(library: LibraryKind, value: impl Into<String>, candidates: Vec<ConflictCandidate>) -> Self {
        Self {
            id: Uuid::new_v4(),
            library,
            value: value.into(),
            candidates,
            resolution: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.is_some()
    }
}
