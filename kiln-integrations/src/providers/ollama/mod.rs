//! Text generation through a running Ollama server.
//!
//! Requests go to `POST {base_url}/api/generate`. Streaming responses are
//! newline-delimited JSON objects, each carrying a `response` fragment,
//! until one arrives with `done: true`.
//!
//! | parameter | Ollama option |
//! |-----------|---------------|
//! | `max_new_tokens` | `num_predict` |
//! | `repetition_penalty` | `repeat_penalty` |
//! | `last_n_tokens` | `repeat_last_n` |
//! | `batch_size` | `num_batch` |
//! | `threads` | `num_thread` |
//!
//! `top_k`, `top_p`, `temperature`, `seed` and `stop` keep their names,
//! and any other key is forwarded unchanged.

mod error;
mod provider;
mod wire;

pub use error::OllamaError;
pub use provider::{DEFAULT_BASE_URL, OllamaProvider};
