//! Construction and generation options for the GGUF provider.

use kiln_core::GenerationParams;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::error::{GgufError, Result};

/// Options fixed when the model is loaded.
///
/// Every generation option doubles as the default for calls that leave it
/// unset. Unknown keys are rejected.
///
/// # Examples
///
/// ```rust
/// use kiln_integrations::providers::gguf::GgufConfig;
/// use std::collections::HashMap;
///
/// let mut options = HashMap::new();
/// options.insert("max_new_tokens".to_string(), serde_json::json!(64));
/// options.insert("gpu_layers".to_string(), serde_json::json!(0));
///
/// let config = GgufConfig::from_map(&options).unwrap();
/// assert_eq!(config.max_new_tokens, 64);
/// assert_eq!(config.top_k, 40);
///
/// options.insert("n_ctx".to_string(), serde_json::json!(2048));
/// assert!(GgufConfig::from_map(&options).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GgufConfig {
    /// Sample from the `top_k` most likely tokens; 0 disables the filter.
    pub top_k: usize,

    /// Nucleus sampling mass; 1.0 disables the filter.
    pub top_p: f64,

    /// Softmax temperature; 0 selects greedy decoding.
    pub temperature: f64,

    /// Penalty applied to recently generated tokens; 1.0 disables it.
    pub repetition_penalty: f32,

    /// Window of recent tokens the repetition penalty looks at.
    pub last_n_tokens: usize,

    /// Sampling seed; negative picks a random seed per call.
    pub seed: i64,

    /// Maximum number of tokens to generate.
    pub max_new_tokens: usize,

    /// Generation ends before any of these strings would be emitted.
    pub stop: Vec<String>,

    /// Start every call from an empty context.
    pub reset: bool,

    /// Prompt evaluation batch size.
    pub batch_size: usize,

    /// CPU threads; negative leaves the runtime default.
    pub threads: i64,

    /// Maximum context in tokens; negative uses the model's own limit.
    pub context_length: i64,

    /// Number of layers to offload; any positive value selects a GPU.
    pub gpu_layers: i64,

    /// Tokenizer file, directory or repository id.
    pub tokenizer: Option<String>,
}

impl Default for GgufConfig {
    fn default() -> Self {
        Self {
            top_k: 40,
            top_p: 0.95,
            temperature: 0.8,
            repetition_penalty: 1.1,
            last_n_tokens: 64,
            seed: -1,
            max_new_tokens: 256,
            stop: Vec::new(),
            reset: true,
            batch_size: 8,
            threads: -1,
            context_length: -1,
            gpu_layers: 0,
            tokenizer: None,
        }
    }
}

impl GgufConfig {
    /// Build from a free-form option map, overriding the defaults.
    pub fn from_map(options: &HashMap<String, serde_json::Value>) -> Result<Self> {
        let object: serde_json::Map<String, serde_json::Value> = options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let config: Self = serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| GgufError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Context limit, if one was configured.
    pub fn context_limit(&self) -> Option<usize> {
        usize::try_from(self.context_length).ok().filter(|n| *n > 0)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        check_sampling(self.top_p, self.temperature, self.repetition_penalty)?;
        if self.batch_size == 0 {
            return Err(GgufError::config("batch_size must be greater than 0"));
        }
        if self.context_length == 0 {
            return Err(GgufError::config(
                "context_length must be positive, or negative for the model default",
            ));
        }
        Ok(())
    }

    /// Merge per-call parameters over these defaults.
    ///
    /// # Errors
    ///
    /// Rejects options this backend does not know and out-of-range values.
    pub fn resolve(&self, params: &GenerationParams) -> Result<SessionParams> {
        if let Some(key) = params.extra.keys().min() {
            return Err(GgufError::config(format!(
                "unsupported generation option '{key}'"
            )));
        }

        let seed = params.seed.unwrap_or(self.seed);
        let resolved = SessionParams {
            top_k: params.top_k.unwrap_or(self.top_k),
            top_p: params.top_p.unwrap_or(self.top_p),
            temperature: params.temperature.unwrap_or(self.temperature),
            repetition_penalty: params.repetition_penalty.unwrap_or(self.repetition_penalty),
            last_n_tokens: params.last_n_tokens.unwrap_or(self.last_n_tokens),
            seed: u64::try_from(seed).unwrap_or_else(|_| rand::random()),
            max_new_tokens: params.max_new_tokens.unwrap_or(self.max_new_tokens),
            stop: params
                .stop
                .clone()
                .unwrap_or_else(|| self.stop.clone())
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect(),
            reset: params.reset.unwrap_or(self.reset),
            batch_size: params.batch_size.unwrap_or(self.batch_size),
            threads: params.threads.unwrap_or(self.threads),
        };

        check_sampling(
            resolved.top_p,
            resolved.temperature,
            resolved.repetition_penalty,
        )?;
        if resolved.batch_size == 0 {
            return Err(GgufError::config("batch_size must be greater than 0"));
        }

        Ok(resolved)
    }
}

fn check_sampling(top_p: f64, temperature: f64, repetition_penalty: f32) -> Result<()> {
    if !(top_p > 0.0 && top_p <= 1.0) {
        return Err(GgufError::config(format!(
            "top_p must be in (0, 1], got {top_p}"
        )));
    }
    if !(temperature >= 0.0) {
        return Err(GgufError::config(format!(
            "temperature must be non-negative, got {temperature}"
        )));
    }
    if !(repetition_penalty > 0.0) {
        return Err(GgufError::config(format!(
            "repetition_penalty must be positive, got {repetition_penalty}"
        )));
    }
    Ok(())
}

/// Fully resolved options for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    /// Top-k filter; 0 disables it.
    pub top_k: usize,
    /// Nucleus mass.
    pub top_p: f64,
    /// Temperature; 0 is greedy.
    pub temperature: f64,
    /// Repetition penalty.
    pub repetition_penalty: f32,
    /// Repetition penalty window.
    pub last_n_tokens: usize,
    /// Concrete sampling seed.
    pub seed: u64,
    /// Token budget.
    pub max_new_tokens: usize,
    /// Non-empty stop sequences.
    pub stop: Vec<String>,
    /// Start from an empty context.
    pub reset: bool,
    /// Prompt batch size.
    pub batch_size: usize,
    /// Requested CPU threads.
    pub threads: i64,
}
