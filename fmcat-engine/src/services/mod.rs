//! Pipeline stage services
//!
//! Each stage of the catalog pipeline is implemented by one service here;
//! the workflow module sequences them and persists their state.

pub mod aggregator;
pub mod allocation_joiner;
pub mod catalog_emitter;
pub mod component_codes;
pub mod group_assigner;
pub mod profile_assigner;
pub mod taxonomy_library;

pub use aggregator::Aggregator;
pub use allocation_joiner::{AllocationInputs, AllocationJoiner, JoinError};
pub use catalog_emitter::CatalogEmitter;
pub use component_codes::{
    CodeProvider, ComponentCodeOrchestrator, GenerationTelemetry, HttpChatProvider, Lexicon,
    ProviderError, ProviderHealthRegistry, ProviderReply, ProviderSpec, ResolvedCode,
};
pub use group_assigner::{GroupAssigner, GroupError};
pub use profile_assigner::ProfileAssigner;
pub use taxonomy_library::{LibraryError, TaxonomyLibrary};
