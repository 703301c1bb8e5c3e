//! Footfall Common Utilities
//!
//! Shared infrastructure for all Footfall crates:
//! - Error types and result aliases
//! - Frame clock and progress ticking for the per-frame pipeline
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
