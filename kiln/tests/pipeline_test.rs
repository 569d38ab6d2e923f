//! End-to-end: configuration, embedding, indexing and retrieval.

use kiln::prelude::*;
use kiln::TEXT_KEY;
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

fn offline_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::defaults().unwrap();
    config.merge_value(json!({ "embeddings": null }));
    config.merge_value(json!({
        "embeddings": { "type": "hashing", "dimension": 128 },
        "vectorstore": { "path": dir.path().join("vectorstore") }
    }));
    config
}

#[test]
fn test_default_config_exposes_sections() {
    let config = AppConfig::defaults().unwrap();
    assert!(config.get("embeddings").is_some());
    assert!(config.get("vectorstore").is_some());
    assert!(config.embeddings().is_ok());
    assert!(config.vectorstore().is_ok());
}

#[tokio::test]
async fn test_hello_round_trip() {
    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::from_config(&offline_config(&dir)).await.unwrap();

    let embedding = pipeline.embedder().embed("hello").await.unwrap();
    assert_eq!(embedding.len(), 128);

    let stored = kiln::core::types::metadata([("text", "hello")]);
    let ids = pipeline
        .store()
        .add(vec![embedding.clone()], vec![stored.clone()])
        .await
        .unwrap();

    let hits = pipeline.store().search_one(&embedding, 1).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, ids[0]);

    let fetched = pipeline.store().get(hits[0].id).await.unwrap();
    assert_eq!(fetched, Some(stored));
}

#[tokio::test]
async fn test_texts_persist_across_pipelines() {
    let dir = TempDir::new().unwrap();

    {
        let pipeline = Pipeline::from_config(&offline_config(&dir)).await.unwrap();
        let mut extra = Metadata::new();
        extra.insert("source".to_string(), json!("notes.md"));
        pipeline
            .add_documents(vec![
                ("the kiln fires clay at high heat".to_string(), extra),
                ("rust compiles to native code".to_string(), Metadata::new()),
            ])
            .await
            .unwrap();
    }

    let pipeline = Pipeline::from_config(&offline_config(&dir)).await.unwrap();
    assert_eq!(pipeline.store().count().await.unwrap(), 2);

    let results = pipeline.search("how hot does a kiln fire clay", 1).await.unwrap();
    assert_eq!(results[0].id, 0);
    assert_eq!(results[0].metadata[TEXT_KEY], json!("the kiln fires clay at high heat"));
    assert_eq!(results[0].metadata["source"], json!("notes.md"));
}

#[tokio::test]
async fn test_stored_text_is_the_embedded_text() {
    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::from_config(&offline_config(&dir)).await.unwrap();

    let mut stale = Metadata::new();
    stale.insert(TEXT_KEY.to_string(), json!("an older revision"));
    stale.insert("revision".to_string(), json!(2));
    let ids = pipeline
        .add_documents(vec![("the current revision".to_string(), stale)])
        .await
        .unwrap();

    let record = pipeline.get(ids[0]).await.unwrap().unwrap();
    assert_eq!(record[TEXT_KEY], json!("the current revision"));
    assert_eq!(record["revision"], json!(2));
}

#[tokio::test]
async fn test_empty_input_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    let pipeline = Pipeline::from_config(&offline_config(&dir)).await.unwrap();

    let ids = pipeline.add_texts(Vec::<String>::new()).await.unwrap();
    assert!(ids.is_empty());
    assert!(pipeline.search("anything", 3).await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Downloads all-MiniLM-L6-v2
async fn test_hello_round_trip_with_default_embedder() {
    let dir = TempDir::new().unwrap();
    let mut config = AppConfig::defaults().unwrap();
    config.merge_value(json!({ "vectorstore": { "path": dir.path().join("vectorstore") } }));

    let pipeline = Pipeline::from_config(&config).await.unwrap();
    assert_eq!(pipeline.embedder().dimension(), 384);

    let ids = pipeline.add_texts(["hello"]).await.unwrap();
    let results = pipeline.search("hello", 1).await.unwrap();
    assert_eq!(results[0].id, ids[0]);
    assert_eq!(results[0].metadata[TEXT_KEY], json!("hello"));
}
