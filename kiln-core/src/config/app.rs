//! Application configuration loading.
//!
//! The effective configuration is built in layers, each deep-merged over
//! the previous one:
//!
//! 1. the built-in defaults compiled into the crate;
//! 2. a JSON file: the path in `KILN_CONFIG`, or `kiln.json` in the working
//!    directory when it exists;
//! 3. environment overrides of the form `KILN__SECTION__KEY=value`.
//!
//! `${VAR}` and `${VAR:default}` placeholders in files are replaced from the
//! environment before parsing.

use std::path::{Path, PathBuf};

use regex::{Captures, Regex};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, info};

use super::{EmbedderConfig, ProviderConfig, VectorStoreConfig};
use crate::{KilnError, Result};

const DEFAULT_CONFIG: &str = include_str!("default.json");

/// Environment variable naming the configuration file.
pub const CONFIG_PATH_ENV: &str = "KILN_CONFIG";

/// Configuration file picked up from the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "kiln.json";

/// Prefix of environment overrides.
pub const ENV_OVERRIDE_PREFIX: &str = "KILN__";

/// Merged application configuration.
///
/// # Examples
///
/// ```rust,no_run
/// use kiln_core::config::AppConfig;
///
/// #[tokio::main]
/// async fn main() -> kiln_core::Result<()> {
///     let config = AppConfig::load().await?;
///     assert!(config.data().contains_key("embeddings"));
///     assert!(config.data().contains_key("vectorstore"));
///
///     let store = config.vectorstore()?;
///     println!("metric: {:?}", store.metric());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    data: Map<String, Value>,
    source: Option<PathBuf>,
}

impl AppConfig {
    /// Build the configuration from the built-in defaults only.
    pub fn defaults() -> Result<Self> {
        let value = parse_json(DEFAULT_CONFIG, "built-in defaults")?;
        Self::from_value(value)
    }

    /// Build a configuration from a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(data) => Ok(Self { data, source: None }),
            other => Err(KilnError::configuration(format!(
                "Configuration root must be an object, got {other}"
            ))),
        }
    }

    /// Load defaults, the discovered configuration file and environment overrides.
    pub async fn load() -> Result<Self> {
        let mut config = Self::defaults()?;

        if let Some(path) = discover_config_file() {
            config.merge_file(&path).await?;
        }

        config.apply_env_overrides(std::env::vars());
        Ok(config)
    }

    /// Load defaults, the given file and environment overrides.
    pub async fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::defaults()?;
        config.merge_file(path.as_ref()).await?;
        config.apply_env_overrides(std::env::vars());
        Ok(config)
    }

    /// Deep-merge a JSON file over the current configuration.
    pub async fn merge_file(&mut self, path: &Path) -> Result<()> {
        debug!("Loading configuration file: {}", path.display());

        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            KilnError::configuration(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        let value = parse_json(&content, &path.display().to_string())?;
        if !value.is_object() {
            return Err(KilnError::configuration(format!(
                "Configuration file {} must contain a JSON object",
                path.display()
            )));
        }

        self.merge_value(value);
        self.source = Some(path.to_path_buf());
        info!("Loaded configuration from {}", path.display());
        Ok(())
    }

    /// Deep-merge a JSON value over the current configuration.
    pub fn merge_value(&mut self, overlay: Value) {
        let mut base = Value::Object(std::mem::take(&mut self.data));
        deep_merge(&mut base, overlay);
        if let Value::Object(data) = base {
            self.data = data;
        }
    }

    /// Apply `KILN__SECTION__KEY=value` overrides.
    ///
    /// Path segments are lower-cased. Values are parsed as JSON when
    /// possible and kept as strings otherwise.
    ///
    /// # Returns
    ///
    /// The number of overrides applied.
    pub fn apply_env_overrides<I>(&mut self, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut applied = 0;

        for (name, raw) in vars {
            let Some(path) = name.strip_prefix(ENV_OVERRIDE_PREFIX) else {
                continue;
            };

            let segments: Vec<String> = path
                .split("__")
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase)
                .collect();
            if segments.is_empty() {
                continue;
            }

            let value = serde_json::from_str(&raw).unwrap_or(Value::String(raw));
            debug!("Applying environment override {} = {}", name, value);

            let mut overlay = value;
            for segment in segments.into_iter().rev() {
                let mut map = Map::new();
                map.insert(segment, overlay);
                overlay = Value::Object(map);
            }
            self.merge_value(overlay);
            applied += 1;
        }

        applied
    }

    /// The merged configuration mapping.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// The file merged last, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Look up a value by dotted key (e.g., `"vectorstore.metric"`).
    pub fn get(&self, key: &str) -> Option<&Value> {
        let mut parts = key.split('.');
        let mut current = self.data.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Deserialize the value under a dotted key.
    pub fn get_typed<T>(&self, key: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let value = self
            .get(key)
            .ok_or_else(|| KilnError::configuration(format!("Configuration key '{key}' not found")))?;

        T::deserialize(value).map_err(|e| {
            KilnError::configuration(format!("Invalid configuration section '{key}': {e}"))
        })
    }

    /// The `embeddings` section.
    pub fn embeddings(&self) -> Result<EmbedderConfig> {
        let config: EmbedderConfig = self.get_typed("embeddings")?;
        config.validate()?;
        Ok(config)
    }

    /// The `vectorstore` section.
    pub fn vectorstore(&self) -> Result<VectorStoreConfig> {
        let config: VectorStoreConfig = self.get_typed("vectorstore")?;
        config.validate()?;
        Ok(config)
    }

    /// The `llm` section.
    pub fn llm(&self) -> Result<ProviderConfig> {
        let config: ProviderConfig = self.get_typed("llm")?;
        config.validate()?;
        Ok(config)
    }
}

fn discover_config_file() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let local = PathBuf::from(DEFAULT_CONFIG_FILE);
    local.is_file().then_some(local)
}

fn parse_json(content: &str, origin: &str) -> Result<Value> {
    let content = substitute_env_variables(content)?;
    serde_json::from_str(&content)
        .map_err(|e| KilnError::configuration(format!("Invalid JSON in {origin}: {e}")))
}

/// Substitute environment variables in configuration content.
///
/// Supports `${VAR_NAME}` and `${VAR_NAME:default_value}`. Unset variables
/// without a default become empty strings.
pub fn substitute_env_variables(content: &str) -> Result<String> {
    let env_var_regex = Regex::new(r"\$\{([^}:]+)(?::([^}]*))?\}")
        .map_err(|e| KilnError::configuration(format!("Invalid substitution pattern: {e}")))?;

    let result = env_var_regex.replace_all(content, |captures: &Captures<'_>| {
        let var_name = captures.get(1).map_or("", |m| m.as_str());
        let default_value = captures.get(2).map_or("", |m| m.as_str());
        std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
    });

    Ok(result.into_owned())
}

/// Merge `overlay` into `base`.
///
/// Objects merge key by key; any other value in `overlay` replaces the one
/// in `base`.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::DistanceMetric;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_defaults_have_required_sections() {
        let config = AppConfig::defaults().unwrap();
        assert!(config.data().contains_key("embeddings"));
        assert!(config.data().contains_key("vectorstore"));
        assert!(config.data().contains_key("llm"));
        assert!(config.source().is_none());
    }

    #[test]
    fn test_default_sections_deserialize() {
        let config = AppConfig::defaults().unwrap();

        assert_eq!(
            config.embeddings().unwrap(),
            EmbedderConfig::fast_embed("sentence-transformers/all-MiniLM-L6-v2")
        );
        assert_eq!(config.vectorstore().unwrap().metric(), DistanceMetric::Cosine);
        assert_eq!(config.llm().unwrap().provider, "gguf");
    }

    #[test]
    fn test_deep_merge_keeps_siblings() {
        let mut base = json!({"a": {"x": 1, "y": 2}, "list": [1, 2]});
        deep_merge(&mut base, json!({"a": {"y": 3}, "list": [9]}));
        assert_eq!(base, json!({"a": {"x": 1, "y": 3}, "list": [9]}));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::defaults().unwrap();
        let applied = config.apply_env_overrides(vec![
            ("KILN__VECTORSTORE__METRIC".to_string(), "dot_product".to_string()),
            ("KILN__EMBEDDINGS__BATCH_SIZE".to_string(), "8".to_string()),
            ("KILN__LLM__CONFIG__STOP".to_string(), "[\"</s>\"]".to_string()),
            ("UNRELATED".to_string(), "1".to_string()),
        ]);

        assert_eq!(applied, 3);
        assert_eq!(config.get("vectorstore.metric"), Some(&json!("dot_product")));
        assert_eq!(config.get("embeddings.batch_size"), Some(&json!(8)));
        assert_eq!(config.get("llm.config.stop"), Some(&json!(["</s>"])));
        assert_eq!(config.get("vectorstore.type"), Some(&json!("flat")));
    }

    #[test]
    fn test_substitution_with_default() {
        let content = r#"{"path": "${KILN_TEST_UNSET_VARIABLE_1:/fallback}"}"#;
        let result = substitute_env_variables(content).unwrap();
        assert_eq!(result, r#"{"path": "/fallback"}"#);
    }

    #[test]
    fn test_substitution_from_environment() {
        unsafe {
            std::env::set_var("KILN_TEST_SUBSTITUTION_VAR", "/from/env");
        }
        let result = substitute_env_variables("${KILN_TEST_SUBSTITUTION_VAR:/fallback}").unwrap();
        assert_eq!(result, "/from/env");
        unsafe {
            std::env::remove_var("KILN_TEST_SUBSTITUTION_VAR");
        }
    }

    #[test]
    fn test_get_missing_key() {
        let config = AppConfig::defaults().unwrap();
        assert!(config.get("vectorstore.nope").is_none());
        assert!(config.get_typed::<String>("nope").is_err());
    }

    #[test]
    fn test_unknown_section_type_rejected() {
        let mut config = AppConfig::defaults().unwrap();
        config.merge_value(json!({"vectorstore": {"type": "faiss_ivf"}}));
        assert!(config.vectorstore().is_err());
    }

    #[test]
    fn test_root_must_be_object() {
        assert!(AppConfig::from_value(json!([1, 2])).is_err());
    }
}
