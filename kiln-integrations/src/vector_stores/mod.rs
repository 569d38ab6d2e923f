//! Vector index implementations.

pub mod flat;

pub use flat::FlatIndexStore;
