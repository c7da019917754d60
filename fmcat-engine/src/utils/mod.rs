//! Utility modules for fmcat-engine

pub mod fuzzy;
pub mod numbering;
pub mod retry;

pub use fuzzy::{distance, rank, FuzzyMatch};
pub use numbering::{alpha_code, pad2, taxonomy_number};
pub use retry::{backoff_delay, retry_with_backoff};
