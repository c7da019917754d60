//! Pipeline session state machine
//!
//! Stages progress strictly in order:
//! PROFILES → GROUPS → MECHANISMS → CAUSES → SUM_CHECKS → COMPONENT_CODES →
//! ALLOCATION → ITEM_CATALOG → TAXONOMY_CATALOGS → LOADSHEET
//!
//! MECHANISMS and CAUSES may pause the session with pending conflicts.

use super::Conflict;
use chrono::{DateTime, Utc};
use fmcat_common::events::PipelineStage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted pipeline session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSession {
    pub session_id: Uuid,
    /// Most recent stage that ran to completion
    pub last_completed: Option<PipelineStage>,
    /// Stage paused on conflicts, if any
    pub awaiting: Option<PipelineStage>,
    /// Conflicts raised by the paused stage that are still unresolved
    pub pending_conflicts: Vec<Conflict>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for PipelineSession {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            last_completed: None,
            awaiting: None,
            pending_conflicts: Vec::new(),
            started_at: now,
            updated_at: now,
        }
    }

    /// True while conflicts block the pipeline
    pub fn is_blocked(&self) -> bool {
        self.awaiting.is_some() && !self.pending_conflicts.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.last_completed == Some(PipelineStage::Loadsheet)
    }

    pub fn mark_completed(&mut self, stage: PipelineStage) {
        self.last_completed = Some(stage);
        if self.awaiting == Some(stage) {
            self.awaiting = None;
        }
        self.updated_at = Utc::now();
    }

    pub fn pause(&mut self, stage: PipelineStage, conflicts: Vec<Conflict>) {
        self.awaiting = Some(stage);
        self.pending_conflicts = conflicts;
        self.updated_at = Utc::now();
    }
}
