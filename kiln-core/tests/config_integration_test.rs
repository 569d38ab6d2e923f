//! Integration tests for the configuration system.

use kiln_core::config::{AppConfig, EmbedderConfig, ProviderConfig, VectorStoreConfig};
use kiln_core::traits::DistanceMetric;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use test_case::test_case;
use tokio::fs;

#[tokio::test]
async fn test_file_overrides_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("kiln.json");

    let file_config = serde_json::json!({
        "embeddings": { "type": "hashing", "dimension": 128 },
        "vectorstore": { "path": "/srv/kiln/index" }
    });
    fs::write(&path, serde_json::to_string_pretty(&file_config).unwrap())
        .await
        .unwrap();

    let config = AppConfig::load_from(&path).await.unwrap();

    assert_eq!(config.source(), Some(path.as_path()));
    assert_eq!(config.embeddings().unwrap(), EmbedderConfig::hashing(128));

    // Sibling keys from the defaults survive the merge.
    assert_eq!(
        config.vectorstore().unwrap(),
        VectorStoreConfig::flat("/srv/kiln/index")
    );
    assert_eq!(config.llm().unwrap().model_type.as_deref(), Some("llama"));
}

#[tokio::test]
async fn test_environment_substitution_in_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("app.json");

    unsafe {
        std::env::set_var("KILN_IT_MODEL_DIR", "/models/qwen");
    }

    let content = r#"{
        "llm": {
            "provider": "gguf",
            "model": "${KILN_IT_MODEL_DIR:/models/default}",
            "model_type": "${KILN_IT_UNSET_MODEL_TYPE:qwen2}"
        }
    }"#;
    fs::write(&path, content).await.unwrap();

    let config = AppConfig::load_from(&path).await.unwrap();
    let llm = config.llm().unwrap();

    assert_eq!(llm.model, "/models/qwen");
    assert_eq!(llm.model_type.as_deref(), Some("qwen2"));
    // Keys not mentioned in the file keep their defaults.
    assert_eq!(
        llm.model_file.as_deref(),
        Some("llama-2-7b-chat.Q4_K_M.gguf")
    );

    unsafe {
        std::env::remove_var("KILN_IT_MODEL_DIR");
    }
}

#[tokio::test]
async fn test_env_overrides_beat_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("kiln.json");
    fs::write(&path, r#"{"vectorstore": {"metric": "euclidean"}}"#)
        .await
        .unwrap();

    let mut config = AppConfig::load_from(&path).await.unwrap();
    assert_eq!(config.vectorstore().unwrap().metric(), DistanceMetric::Euclidean);

    config.apply_env_overrides(vec![(
        "KILN__VECTORSTORE__METRIC".to_string(),
        "dot_product".to_string(),
    )]);
    assert_eq!(config.vectorstore().unwrap().metric(), DistanceMetric::DotProduct);
}

#[tokio::test]
async fn test_missing_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let result = AppConfig::load_from(temp_dir.path().join("absent.json")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_invalid_json_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.json");
    fs::write(&path, "{ not json").await.unwrap();

    let err = AppConfig::load_from(&path).await.unwrap_err();
    assert!(err.to_string().contains("Invalid JSON"));
}

#[test_case("cosine", DistanceMetric::Cosine ; "cosine")]
#[test_case("euclidean", DistanceMetric::Euclidean ; "euclidean")]
#[test_case("dot_product", DistanceMetric::DotProduct ; "dot product")]
fn test_metric_names(name: &str, expected: DistanceMetric) {
    let mut config = AppConfig::defaults().unwrap();
    config.merge_value(serde_json::json!({"vectorstore": {"metric": name}}));
    assert_eq!(config.vectorstore().unwrap().metric(), expected);
}

#[test]
fn test_provider_section_round_trip() {
    let provider = ProviderConfig::new("ollama", "llama3")
        .with_base_url("http://localhost:11434")
        .with_config("temperature", 0.2);

    let mut config = AppConfig::defaults().unwrap();
    config.merge_value(serde_json::json!({ "llm": null }));
    config.merge_value(serde_json::json!({ "llm": serde_json::to_value(&provider).unwrap() }));

    assert_eq!(config.llm().unwrap(), provider);
}
