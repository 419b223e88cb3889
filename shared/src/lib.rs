//! Shared types for the downline platform
//!
//! Domain models persisted by downline-server plus small utilities
//! (timestamps, ID generation) used across crates.

pub mod models;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};
