//! Event types for the catalog pipeline
//!
//! Provides the shared `CatalogEvent` enum, the fixed `PipelineStage`
//! sequence and the broadcast `EventBus`.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// The ten fixed pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStage {
    /// Catalog profile per (asset class, location)
    Profiles,
    /// Object-part group per (location, maintainable item)
    Groups,
    /// Failure mechanism library reconciliation
    Mechanisms,
    /// Failure cause library reconciliation
    Causes,
    /// Sum-check aggregation per (location, item, component)
    SumChecks,
    /// 4-character component code resolution
    ComponentCodes,
    /// Join of taxonomy and component codes onto every record
    Allocation,
    /// Catalog B (object parts)
    ItemCatalog,
    /// Catalogs C (damage) and 5 (cause)
    TaxonomyCatalogs,
    /// Merge, sort and dedupe into the final load sheet
    Loadsheet,
}

impl PipelineStage {
    /// All stages in execution order
    pub const ALL: [PipelineStage; 10] = [
        PipelineStage::Profiles,
        PipelineStage::Groups,
        PipelineStage::Mechanisms,
        PipelineStage::Causes,
        PipelineStage::SumChecks,
        PipelineStage::ComponentCodes,
        PipelineStage::Allocation,
        PipelineStage::ItemCatalog,
        PipelineStage::TaxonomyCatalogs,
        PipelineStage::Loadsheet,
    ];

    /// 1-based position in the pipeline
    pub fn number(self) -> usize {
        self as usize + 1
    }

    /// Stage following this one, `None` after the load sheet
    pub fn next(self) -> Option<PipelineStage> {
        Self::ALL.get(self as usize + 1).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Profiles => "profiles",
            PipelineStage::Groups => "groups",
            PipelineStage::Mechanisms => "mechanisms",
            PipelineStage::Causes => "causes",
            PipelineStage::SumChecks => "sum_checks",
            PipelineStage::ComponentCodes => "component_codes",
            PipelineStage::Allocation => "allocation",
            PipelineStage::ItemCatalog => "item_catalog",
            PipelineStage::TaxonomyCatalogs => "taxonomy_catalogs",
            PipelineStage::Loadsheet => "loadsheet",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a component code came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "provider", rename_all = "snake_case")]
pub enum CodeSource {
    /// Previously issued entry reused from the component library
    Library,
    LexiconExact,
    LexiconFuzzy,
    /// External provider, by provider id
    Provider(String),
    Fallback,
}

/// Catalog pipeline events
///
/// Events are broadcast via EventBus and serialize with a `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CatalogEvent {
    /// A stage began executing
    StageStarted {
        session_id: Uuid,
        stage: PipelineStage,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A stage finished and its state was persisted
    StageCompleted {
        session_id: Uuid,
        stage: PipelineStage,
        /// Number of output items the stage produced
        items: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A library stage raised conflicts and the pipeline is paused
    ConflictsRaised {
        session_id: Uuid,
        stage: PipelineStage,
        conflict_ids: Vec<Uuid>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A component code was resolved
    ComponentCodeResolved {
        component: String,
        code: String,
        source: CodeSource,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Load sheet emitted
    PipelineCompleted {
        session_id: Uuid,
        rows: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus for catalog events
///
/// Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CatalogEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// * `capacity` - Number of events to buffer before lagging receivers drop old events
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: CatalogEvent,
    ) -> Result<usize, broadcast::error::SendError<CatalogEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: CatalogEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
