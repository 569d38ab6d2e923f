//! Core data types shared across Kiln crates.

pub mod generation;
pub mod search;

// Re-export all types for convenience
pub use generation::*;
pub use search::*;
