//! Data models for fmcat-engine

pub mod component;
pub mod conflict;
pub mod loadsheet;
pub mod profile;
pub mod record;
pub mod session;
pub mod taxonomy;

pub use component::{ComponentCodeEntry, ComponentLibrary};
pub use conflict::{Conflict, ConflictCandidate, Resolution};
pub use loadsheet::{CatalogType, LoadsheetRow};
pub use profile::{CatalogProfile, ObjectPartGroup};
pub use record::{AllocatedRecord, RawRecord, SumCheck, SumCheckedRecord};
pub use session::PipelineSession;
pub use taxonomy::{LibraryKind, TaxonomyEntry};
