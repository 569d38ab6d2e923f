//! Configuration types for Kiln components.
//!
//! Section types are plain serde structs and tagged enums; [`AppConfig`]
//! assembles them from defaults, files and the environment.

pub mod app;
pub mod embedder;
pub mod provider;
pub mod store;

pub use app::{AppConfig, deep_merge, substitute_env_variables};
pub use embedder::EmbedderConfig;
pub use provider::{ProviderConfig, normalize_base_url};
pub use store::VectorStoreConfig;
