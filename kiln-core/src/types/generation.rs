//! Sampling parameters passed through to text generation backends.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Per-call generation parameters.
///
/// Every field is optional: an unset field falls back to whatever the
/// provider was constructed with, which in turn falls back to the backend's
/// own default. Keys that have no dedicated field are kept in `extra` and
/// forwarded to the backend as-is.
///
/// # Examples
///
/// ```rust
/// use kiln_core::types::GenerationParams;
///
/// let params = GenerationParams::new()
///     .with_max_new_tokens(64)
///     .with_temperature(0.2)
///     .with_stop(["\n\n"]);
///
/// assert_eq!(params.max_new_tokens, Some(64));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Sample only from the `top_k` most likely tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<usize>,

    /// Nucleus sampling probability mass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    /// Sampling temperature. `0.0` means greedy decoding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Penalty applied to recently generated tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f32>,

    /// Window of recent tokens the repetition penalty looks at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_n_tokens: Option<usize>,

    /// RNG seed. Negative values pick a random seed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,

    /// Maximum number of tokens to generate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<usize>,

    /// Generation stops when any of these strings is produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,

    /// Whether to discard the previous session before evaluating the prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset: Option<bool>,

    /// Number of prompt tokens evaluated per forward pass.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<usize>,

    /// CPU threads hint. Negative values mean "let the runtime decide".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threads: Option<i64>,

    /// Backend-specific keys without a dedicated field.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl GenerationParams {
    /// Create an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build parameters from a free-form JSON mapping.
    pub fn from_value(value: serde_json::Value) -> crate::Result<Self> {
        serde_json::from_value(value).map_err(|e| {
            crate::KilnError::configuration(format!("Invalid generation parameters: {e}"))
        })
    }

    /// Set `top_k`.
    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }

    /// Set `top_p`.
    #[must_use]
    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Set the temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the repetition penalty.
    #[must_use]
    pub fn with_repetition_penalty(mut self, penalty: f32) -> Self {
        self.repetition_penalty = Some(penalty);
        self
    }

    /// Set the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the maximum number of generated tokens.
    #[must_use]
    pub fn with_max_new_tokens(mut self, max_new_tokens: usize) -> Self {
        self.max_new_tokens = Some(max_new_tokens);
        self
    }

    /// Set the stop sequences.
    #[must_use]
    pub fn with_stop<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop = Some(stop.into_iter().map(Into::into).collect());
        self
    }

    /// Set whether the session is reset before the prompt.
    #[must_use]
    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = Some(reset);
        self
    }

    /// Add a backend-specific key.
    pub fn with_extra<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<serde_json::Value>,
    {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Layer `other` on top of `self`: every field set in `other` wins.
    #[must_use]
    pub fn merged_with(&self, other: &GenerationParams) -> GenerationParams {
        let mut extra = self.extra.clone();
        extra.extend(other.extra.iter().map(|(k, v)| (k.clone(), v.clone())));

        GenerationParams {
            top_k: other.top_k.or(self.top_k),
            top_p: other.top_p.or(self.top_p),
            temperature: other.temperature.or(self.temperature),
            repetition_penalty: other.repetition_penalty.or(self.repetition_penalty),
            last_n_tokens: other.last_n_tokens.or(self.last_n_tokens),
            seed: other.seed.or(self.seed),
            max_new_tokens: other.max_new_tokens.or(self.max_new_tokens),
            stop: other.stop.clone().or_else(|| self.stop.clone()),
            reset: other.reset.or(self.reset),
            batch_size: other.batch_size.or(self.batch_size),
            threads: other.threads.or(self.threads),
            extra,
        }
    }

    /// Whether any backend-specific keys are present.
    pub fn has_extra(&self) -> bool {
        !self.extra.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_value_splits_known_and_extra_keys() {
        let params = GenerationParams::from_value(serde_json::json!({
            "max_new_tokens": 32,
            "stop": ["###"],
            "mirostat": 2
        }))
        .unwrap();

        assert_eq!(params.max_new_tokens, Some(32));
        assert_eq!(params.stop, Some(vec!["###".to_string()]));
        assert_eq!(params.extra.get("mirostat"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_from_value_rejects_wrong_types() {
        let result = GenerationParams::from_value(serde_json::json!({"top_k": "many"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_prefers_overlay() {
        let base = GenerationParams::new()
            .with_temperature(0.8)
            .with_max_new_tokens(256)
            .with_extra("a", 1);
        let call = GenerationParams::new()
            .with_max_new_tokens(16)
            .with_extra("b", 2);

        let merged = base.merged_with(&call);
        assert_eq!(merged.temperature, Some(0.8));
        assert_eq!(merged.max_new_tokens, Some(16));
        assert_eq!(merged.extra.len(), 2);
    }

    #[test]
    fn test_serialization_skips_unset_fields() {
        let params = GenerationParams::new().with_seed(7);
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json, serde_json::json!({"seed": 7}));
    }
}
