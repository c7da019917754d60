//! fmcat-engine library interface
//!
//! Failure-mode catalog pipeline: profiles, groups, taxonomy libraries,
//! component codes and load-sheet emission.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

pub use crate::error::{CatalogError, CatalogResult};
pub use crate::workflow::{CatalogPipeline, PipelineOutcome};
