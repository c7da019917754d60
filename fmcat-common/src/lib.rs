//! # fmcat Common Library
//!
//! Shared code for the failure-mode catalog tooling:
//! - Error and result types
//! - TOML configuration loading and config-file resolution
//! - Pipeline event types and the broadcast EventBus

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
