//! Factory traits for creating components from configuration.
//!
//! Registries map a configuration's provider name or type tag to the
//! factory that builds it, so backends can be swapped without touching
//! callers.

pub mod embedder;
pub mod provider;

pub use embedder::*;
pub use provider::*;
