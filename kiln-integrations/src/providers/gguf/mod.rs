//! Quantized GGUF models running in-process on Candle.
//!
//! Supported architectures are Llama (and Mistral, which shares its
//! weight layout), Qwen2 and Phi-3. Models load from a local file, a
//! directory, or a Hugging Face repository.
//!
//! Every [`GgufConfig`] field can be set when the provider is built and
//! overridden per call through [`kiln_core::GenerationParams`]:
//!
//! | key | default |
//! |-----|---------|
//! | `top_k` | 40 |
//! | `top_p` | 0.95 |
//! | `temperature` | 0.8 |
//! | `repetition_penalty` | 1.1 |
//! | `last_n_tokens` | 64 |
//! | `seed` | -1 (random) |
//! | `max_new_tokens` | 256 |
//! | `stop` | `[]` |
//! | `reset` | true |
//! | `batch_size` | 8 |
//! | `threads` | -1 |
//!
//! `context_length`, `gpu_layers` and `tokenizer` only apply at load time.

mod config;
mod device;
mod error;
mod generation;
mod loader;
mod model;
mod provider;
mod tokenizer;

pub use config::{GgufConfig, SessionParams};
pub use device::{DeviceKind, select_device};
pub use error::GgufError;
pub use generation::{FinishReason, GenerationSummary};
pub use loader::{ModelFiles, TOKENIZER_FILE, locate};
pub use model::{ModelArch, ModelMetadata};
pub use provider::GgufProvider;
