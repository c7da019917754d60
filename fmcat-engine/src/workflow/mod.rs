//! Pipeline sequencing and session handling

pub mod pipeline;

pub use pipeline::{load_library, CatalogPipeline, PipelineOutcome};
