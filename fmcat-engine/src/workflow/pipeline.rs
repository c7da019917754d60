//! Catalog Pipeline
//!
//! Runs the ten fixed stages in order over one batch of records.
//!
//! # Stages
//! 1. Profiles, 2. Groups
//! 3. Mechanisms, 4. Causes (may pause on conflicts)
//! 5. Sum checks, 6. Component codes, 7. Allocation
//! 8. Item catalog, 9. Taxonomy catalogs, 10. Load sheet
//!
//! Libraries and session state are persisted as each stage completes, so a
//! failed run leaves every earlier stage's output valid for a retry.
//!
//! # Conflicts
//! When a taxonomy stage raises conflicts the session is paused and
//! [`PipelineOutcome::AwaitingResolution`] is returned. Decisions are
//! submitted with [`CatalogPipeline::resolve`]; the next `run` call with the
//! same records resumes. Stages before the paused one are deterministic and
//! are simply recomputed.

use crate::db::{self, CatalogStore, COMPONENT_LIBRARY_KEY, SESSION_STATE_KEY};
use crate::error::{CatalogError, CatalogResult};
use crate::models::{
    ComponentCodeEntry, ComponentLibrary, Conflict, LibraryKind, LoadsheetRow, PipelineSession,
    RawRecord, Resolution, SumCheck, SumCheckedRecord,
};
use crate::services::taxonomy_library::DEFAULT_CONFLICT_THRESHOLD;
use crate::services::{
    Aggregator, AllocationInputs, AllocationJoiner, CatalogEmitter, ComponentCodeOrchestrator,
    GenerationTelemetry, GroupAssigner, ProfileAssigner, TaxonomyLibrary,
};
use chrono::Utc;
use fmcat_common::events::{CatalogEvent, CodeSource, EventBus, PipelineStage};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a pipeline run
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// All ten stages ran; the final load sheet
    Completed { rows: Vec<LoadsheetRow> },
    /// A taxonomy stage is waiting on decisions
    AwaitingResolution {
        stage: PipelineStage,
        conflicts: Vec<Conflict>,
    },
}

impl PipelineOutcome {
    /// Load sheet rows, or `ConflictPending` while paused
    pub fn into_rows(self) -> CatalogResult<Vec<LoadsheetRow>> {
        match self {
            PipelineOutcome::Completed { rows } => Ok(rows),
            PipelineOutcome::AwaitingResolution { stage, conflicts } => Err(CatalogError::ConflictPending {
                stage,
                count: conflicts.len(),
            }),
        }
    }
}

/// Sequential catalog pipeline over a keyed store
pub struct CatalogPipeline {
    store: Arc<dyn CatalogStore>,
    orchestrator: ComponentCodeOrchestrator,
    events: EventBus,
    taxonomy_threshold: f64,
    session: PipelineSession,
}

impl CatalogPipeline {
    /// Open the pipeline, restoring any persisted session
    pub async fn open(
        store: Arc<dyn CatalogStore>,
        orchestrator: ComponentCodeOrchestrator,
        events: EventBus,
    ) -> CatalogResult<Self> {
        let session = match store.get_json(SESSION_STATE_KEY).await? {
            Some(value) => serde_json::from_value(value).map_err(fmcat_common::Error::from)?,
            None => PipelineSession::new(),
        };

        if session.is_blocked() {
            info!(
                session_id = %session.session_id,
                stage = ?session.awaiting,
                pending = session.pending_conflicts.len(),
                "Restored paused pipeline session"
            );
        }

        Ok(Self {
            store,
            orchestrator,
            events,
            taxonomy_threshold: DEFAULT_CONFLICT_THRESHOLD,
            session,
        })
    }

    pub fn with_taxonomy_threshold(mut self, threshold: f64) -> Self {
        self.taxonomy_threshold = threshold;
        self
    }

    pub fn session(&self) -> &PipelineSession {
        &self.session
    }

    pub fn pending_conflicts(&self) -> &[Conflict] {
        &self.session.pending_conflicts
    }

    pub fn telemetry(&self) -> &[GenerationTelemetry] {
        self.orchestrator.telemetry()
    }

    /// Run every stage over `records`
    ///
    /// Returns the pending conflicts without running anything while the
    /// session is blocked.
    pub async fn run(&mut self, records: &[RawRecord]) -> CatalogResult<PipelineOutcome> {
        if self.session.is_blocked() {
            warn!(
                session_id = %self.session.session_id,
                pending = self.session.pending_conflicts.len(),
                "Pipeline blocked on unresolved conflicts"
            );
            return Ok(self.awaiting());
        }

        if self.session.awaiting.is_some() {
            info!(session_id = %self.session.session_id, "Resuming pipeline after conflict resolution");
        } else {
            self.session = PipelineSession::new();
            info!(session_id = %self.session.session_id, records = records.len(), "Starting catalog pipeline");
        }

        // Stage 1
        self.started(PipelineStage::Profiles);
        let profiles = ProfileAssigner::new().assign(records);
        self.completed(PipelineStage::Profiles, profiles.len()).await?;

        // Stage 2
        self.started(PipelineStage::Groups);
        let groups = GroupAssigner::new()
            .assign(records, &profiles)
            .map_err(|e| CatalogError::stage(PipelineStage::Groups, e.to_string()))?;
        self.completed(PipelineStage::Groups, groups.len()).await?;

        // Stages 3 and 4
        let mechanisms = match self.reconcile(LibraryKind::Mechanism, records).await? {
            Ok(library) => library,
            Err(outcome) => return Ok(outcome),
        };
        let causes = match self.reconcile(LibraryKind::Cause, records).await? {
            Ok(library) => library,
            Err(outcome) => return Ok(outcome),
        };

        // Stage 5
        self.started(PipelineStage::SumChecks);
        let checked = Aggregator::new().aggregate(records, &mechanisms, &causes);
        self.completed(PipelineStage::SumChecks, checked.len()).await?;

        // Stage 6
        self.started(PipelineStage::ComponentCodes);
        let components = self.assign_component_codes(&checked).await?;
        self.completed(PipelineStage::ComponentCodes, components.entries.len()).await?;

        // Stage 7
        self.started(PipelineStage::Allocation);
        let allocated = AllocationJoiner::new()
            .join(
                &checked,
                &AllocationInputs {
                    profiles: &profiles,
                    groups: &groups,
                    mechanisms: &mechanisms,
                    causes: &causes,
                    components: &components,
                },
            )
            .map_err(|e| CatalogError::stage(PipelineStage::Allocation, e.to_string()))?;
        self.completed(PipelineStage::Allocation, allocated.len()).await?;

        let emitter = CatalogEmitter::new();

        // Stage 8
        self.started(PipelineStage::ItemCatalog);
        let items = emitter.item_catalog(&allocated, &profiles);
        self.completed(PipelineStage::ItemCatalog, items.len()).await?;

        // Stage 9
        self.started(PipelineStage::TaxonomyCatalogs);
        let damage = emitter.damage_catalog(&allocated, &profiles);
        let cause = emitter.cause_catalog(&allocated, &profiles);
        self.completed(PipelineStage::TaxonomyCatalogs, damage.len() + cause.len())
            .await?;

        // Stage 10
        self.started(PipelineStage::Loadsheet);
        let rows = emitter.merge([items, damage, cause]);
        self.completed(PipelineStage::Loadsheet, rows.len()).await?;

        info!(
            session_id = %self.session.session_id,
            rows = rows.len(),
            profiles = profiles.len(),
            groups = groups.len(),
            "Catalog pipeline completed"
        );
        self.events.emit_lossy(CatalogEvent::PipelineCompleted {
            session_id: self.session.session_id,
            rows: rows.len(),
            timestamp: Utc::now(),
        });

        Ok(PipelineOutcome::Completed { rows })
    }

    /// Apply decisions to pending conflicts
    ///
    /// The whole batch is validated before any library is touched. Returns
    /// the conflicts still pending afterwards.
    pub async fn resolve(&mut self, resolutions: HashMap<Uuid, Resolution>) -> CatalogResult<Vec<Conflict>> {
        let pending: HashSet<Uuid> = self.session.pending_conflicts.iter().map(|c| c.id).collect();
        if let Some(unknown) = resolutions.keys().find(|id| !pending.contains(id)) {
            return Err(CatalogError::InvalidResolution(format!(
                "conflict {} is not pending",
                unknown
            )));
        }

        let mut libraries: HashMap<LibraryKind, TaxonomyLibrary> = HashMap::new();
        for conflict in &self.session.pending_conflicts {
            let Some(resolution) = resolutions.get(&conflict.id) else {
                continue;
            };
            let library = match libraries.entry(conflict.library) {
                std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
                std::collections::hash_map::Entry::Vacant(entry) => {
                    entry.insert(load_library(self.store.as_ref(), conflict.library).await?)
                }
            };
            library
                .apply_resolution(conflict, resolution)
                .map_err(|e| CatalogError::InvalidResolution(e.to_string()))?;
        }

        for library in libraries.values() {
            db::save(self.store.as_ref(), library.kind.store_key(), library).await?;
        }

        let mut resolved = Vec::new();
        self.session.pending_conflicts.retain(|conflict| match resolutions.get(&conflict.id) {
            Some(resolution) => {
                let mut done = conflict.clone();
                done.resolution = Some(resolution.clone());
                resolved.push(done);
                false
            }
            None => true,
        });
        self.session.updated_at = Utc::now();
        self.save_session().await?;

        info!(
            session_id = %self.session.session_id,
            resolved = resolved.len(),
            remaining = self.session.pending_conflicts.len(),
            "Applied conflict resolutions"
        );

        Ok(self.session.pending_conflicts.clone())
    }

    /// Stages 3 and 4: grow one taxonomy library with the batch's values
    ///
    /// Inner `Err` carries the paused outcome.
    async fn reconcile(
        &mut self,
        kind: LibraryKind,
        records: &[RawRecord],
    ) -> CatalogResult<Result<TaxonomyLibrary, PipelineOutcome>> {
        let stage = match kind {
            LibraryKind::Mechanism => PipelineStage::Mechanisms,
            LibraryKind::Cause => PipelineStage::Causes,
        };
        self.started(stage);

        let values: BTreeSet<String> = records
            .iter()
            .map(|r| match kind {
                LibraryKind::Mechanism => r.mechanism.clone(),
                LibraryKind::Cause => r.cause.clone(),
            })
            .collect();

        let mut library = load_library(self.store.as_ref(), kind).await?;
        let conflicts = library.reconcile(&values, self.taxonomy_threshold);
        db::save(self.store.as_ref(), kind.store_key(), &library).await?;

        if !conflicts.is_empty() {
            self.session.pause(stage, conflicts);
            self.save_session().await?;
            warn!(
                session_id = %self.session.session_id,
                %stage,
                conflicts = self.session.pending_conflicts.len(),
                "Pipeline paused for conflict resolution"
            );
            self.events.emit_lossy(CatalogEvent::ConflictsRaised {
                session_id: self.session.session_id,
                stage,
                conflict_ids: self.session.pending_conflicts.iter().map(|c| c.id).collect(),
                timestamp: Utc::now(),
            });
            return Ok(Err(self.awaiting()));
        }

        self.completed(stage, library.len()).await?;
        Ok(Ok(library))
    }

    /// Stage 6: one code per distinct (component, sum check)
    ///
    /// Entries already in the component library are reused. New codes are
    /// resolved one at a time against the growing issued set.
    async fn assign_component_codes(&mut self, checked: &[SumCheckedRecord]) -> CatalogResult<ComponentLibrary> {
        let mut library: ComponentLibrary = db::load(self.store.as_ref(), COMPONENT_LIBRARY_KEY).await?;
        let mut issued: HashSet<String> = library.entries.iter().map(|e| e.code.clone()).collect();

        let mut seen: HashSet<(&str, SumCheck)> = HashSet::new();
        let mut reused = 0usize;
        let mut created = 0usize;

        for record in checked {
            let component = record.record.component.as_str();
            if !seen.insert((component, record.sum_check)) {
                continue;
            }

            if let Some(entry) = library.find(component, record.sum_check) {
                debug!(component, code = %entry.code, "Reusing issued component code");
                self.events.emit_lossy(CatalogEvent::ComponentCodeResolved {
                    component: component.to_string(),
                    code: entry.code.clone(),
                    source: CodeSource::Library,
                    timestamp: Utc::now(),
                });
                reused += 1;
                continue;
            }

            let resolved = self.orchestrator.resolve(component, &mut issued).await;
            library
                .entries
                .push(ComponentCodeEntry::new(component, record.sum_check, resolved.code));
            created += 1;
        }

        library.refresh_context_flags();
        db::save(self.store.as_ref(), COMPONENT_LIBRARY_KEY, &library).await?;

        info!(
            reused,
            created,
            total = library.entries.len(),
            "Assigned component codes"
        );

        Ok(library)
    }

    fn awaiting(&self) -> PipelineOutcome {
        PipelineOutcome::AwaitingResolution {
            stage: self.session.awaiting.unwrap_or(PipelineStage::Mechanisms),
            conflicts: self.session.pending_conflicts.clone(),
        }
    }

    fn started(&self, stage: PipelineStage) {
        debug!(session_id = %self.session.session_id, %stage, number = stage.number(), "Stage started");
        self.events.emit_lossy(CatalogEvent::StageStarted {
            session_id: self.session.session_id,
            stage,
            timestamp: Utc::now(),
        });
    }

    async fn completed(&mut self, stage: PipelineStage, items: usize) -> CatalogResult<()> {
        self.session.mark_completed(stage);
        self.save_session().await?;
        info!(session_id = %self.session.session_id, %stage, items, "Stage completed");
        self.events.emit_lossy(CatalogEvent::StageCompleted {
            session_id: self.session.session_id,
            stage,
            items,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn save_session(&self) -> CatalogResult<()> {
        db::save(self.store.as_ref(), SESSION_STATE_KEY, &self.session).await?;
        Ok(())
    }
}

/// Persisted taxonomy library, empty when never stored
pub async fn load_library(store: &dyn CatalogStore, kind: LibraryKind) -> CatalogResult<TaxonomyLibrary> {
    match store.get_json(kind.store_key()).await? {
        Some(value) => {
            let library: TaxonomyLibrary = serde_json::from_value(value).map_err(fmcat_common::Error::from)?;
            Ok(library)
        }
        None => Ok(TaxonomyLibrary::new(kind)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::ProviderHealthRegistry;
    use fmcat_common::config::RetryConfig;

    fn record(location: &str, item: &str, component: &str, mechanism: &str, cause: &str) -> RawRecord {
        RawRecord {
            asset_class: "CRGY".to_string(),
            location_id: location.to_string(),
            location_name: format!("Crusher {}", location),
            item: item.to_string(),
            component: component.to_string(),
            mechanism: mechanism.to_string(),
            cause: cause.to_string(),
        }
    }

    async fn pipeline(store: Arc<dyn CatalogStore>) -> CatalogPipeline {
        let orchestrator = ComponentCodeOrchestrator::new(vec![], RetryConfig::default(), ProviderHealthRegistry::new());
        CatalogPipeline::open(store, orchestrator, EventBus::default()).await.unwrap()
    }

    #[tokio::test]
    async fn test_clean_run_completes_all_stages() {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        let mut pipeline = pipeline(store.clone()).await;
        let records = vec![
            record("ABC-001", "Pump", "Bearing", "Wear", "Age"),
            record("ABC-002", "Motor", "Winding", "Burnout", "Overload"),
        ];

        let outcome = pipeline.run(&records).await.unwrap();

        let PipelineOutcome::Completed { rows } = outcome else {
            panic!("expected completion");
        };
        assert!(!rows.is_empty());
        assert!(pipeline.session().is_complete());
        let components: ComponentLibrary = db::load(store.as_ref(), COMPONENT_LIBRARY_KEY).await.unwrap();
        assert_eq!(components.entries.len(), 2);
    }

    #[tokio::test]
    async fn test_blocked_session_does_not_run_downstream() {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        let mut pipeline = pipeline(store.clone()).await;
        pipeline.run(&[record("ABC-001", "Pump", "Seal", "Wear", "Age")]).await.unwrap();

        let outcome = pipeline
            .run(&[record("ABC-001", "Pump", "Seal", "Wears", "Age")])
            .await
            .unwrap();
        let PipelineOutcome::AwaitingResolution { stage, conflicts } = outcome else {
            panic!("expected conflicts");
        };
        assert_eq!(stage, PipelineStage::Mechanisms);
        assert_eq!(conflicts.len(), 1);

        let again = pipeline
            .run(&[record("ABC-001", "Pump", "Seal", "Wears", "Age")])
            .await
            .unwrap();
        assert_eq!(pipeline.session().last_completed, Some(PipelineStage::Groups));
        assert!(matches!(
            again.into_rows(),
            Err(CatalogError::ConflictPending { stage: PipelineStage::Mechanisms, count: 1 })
        ));
    }

    #[tokio::test]
    async fn test_unknown_conflict_id_is_rejected() {
        let store: Arc<dyn CatalogStore> = Arc::new(MemoryStore::new());
        let mut pipeline = pipeline(store).await;

        let mut resolutions = HashMap::new();
        resolutions.insert(Uuid::new_v4(), Resolution::Reject);

        let result = pipeline.resolve(resolutions).await;
        assert!(matches!(result, Err(CatalogError::InvalidResolution(_))));
    }
}
