use httpmock::{
    Method::{GET, POST},
    MockServer,
};
use serde_json::json;
use tempfile::TempDir;
use trendlens::{
    analysis::{Analyzer, Source},
    config::{Config, EmbeddingBackend},
};

const INSIGHTS: &str = r#"{"opportunities":[{"title":"Invoicing for freelancers","confidence":0.75,"evidence":"Repeated requests","cluster_refs":[1],"sources":["reddit","twitter"]}],"trends":[{"topic":"Freelance tooling","momentum":"rising","mentions":4}],"pain_points":[]}"#;

fn config_for(server: &MockServer, data_dir: &TempDir) -> Config {
    Config {
        data_dir: data_dir.path().to_path_buf(),
        ollama_url: server.base_url(),
        embedding_provider: EmbeddingBackend::Hashing,
        embedding_dimension: 384,
        insight_timeout_secs: 5,
        ..Config::default()
    }
}

fn aggregated_batch() -> serde_json::Value {
    json!({
        "by_source": {
            "reddit": {
                "data": [
                    { "title": "Looking for a budgeting app for freelancers", "selftext": "", "score": 10, "num_comments": 2 },
                    { "title": "My cat knocked the plant off the shelf again", "score": 1, "num_comments": 0 }
                ]
            },
            "twitter": {
                "data": [
                    { "text": "Looking for a simple budgeting app for freelancers", "public_metrics": { "like_count": 3, "retweet_count": 1, "reply_count": 0 } },
                    { "text": "Anyone looking for a budgeting app for freelancers?", "public_metrics": { "like_count": 0 } },
                    { "text": "   " }
                ]
            }
        }
    })
}

#[tokio::test]
async fn aggregated_batch_runs_end_to_end() {
    let server = MockServer::start_async().await;
    let generate = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/generate")
                .json_body_partial(r#"{ "model": "qwen2.5:14b", "format": "json" }"#)
                .body_contains("3 similar posts from reddit, twitter");
            then.status(200)
                .json_body(json!({ "response": INSIGHTS, "done": true }));
        })
        .await;

    let data_dir = TempDir::new().expect("tempdir");
    std::fs::write(
        data_dir.path().join("mixed_batch.json"),
        aggregated_batch().to_string(),
    )
    .expect("write batch");

    let analyzer = Analyzer::from_config(&config_for(&server, &data_dir)).expect("analyzer");
    let envelope = analyzer.analyze("mixed_batch.json", None).await;

    generate.assert();
    assert!(envelope.success, "{:?}", envelope.error);
    let stats = envelope.stats.expect("stats");
    assert_eq!(stats.total_items, 4);
    assert_eq!(stats.clusters_found, 2);
    assert_eq!(stats.meaningful_clusters, 1);
    assert_eq!(stats.sources, vec![Source::Reddit, Source::Twitter]);
    assert_eq!(envelope.analysis.trends[0].topic, "Freelance tooling");

    let stored = analyzer
        .load_analysis("mixed_batch_analysis.json")
        .await
        .expect("stored analysis");
    assert_eq!(stored.insights, envelope.analysis);
    assert_eq!(stored.model, "qwen2.5:14b");
}

#[tokio::test]
async fn unreachable_generator_still_persists_the_clustering() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(503).body("model is loading");
        })
        .await;

    let data_dir = TempDir::new().expect("tempdir");
    std::fs::write(
        data_dir.path().join("mixed_batch.json"),
        aggregated_batch().to_string(),
    )
    .expect("write batch");

    let analyzer = Analyzer::from_config(&config_for(&server, &data_dir)).expect("analyzer");
    let envelope = analyzer.analyze("mixed_batch.json", None).await;

    assert!(envelope.success);
    assert!(envelope.analysis.is_empty());
    assert!(
        envelope
            .analysis
            .error
            .as_deref()
            .is_some_and(|error| error.contains("503"))
    );
    assert!(data_dir.path().join("mixed_batch_analysis.json").exists());
}

#[tokio::test]
async fn models_are_listed_through_the_analyzer() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/tags");
            then.status(200).json_body(json!({
                "models": [
                    { "name": "all-minilm:latest", "size": 45_000_000_u64, "modified_at": "2024-09-01T00:00:00Z" },
                    { "name": "llama3.1:8b", "size": 4_920_753_328_u64, "modified_at": "2024-09-05T00:00:00Z" }
                ]
            }));
        })
        .await;

    let data_dir = TempDir::new().expect("tempdir");
    let analyzer = Analyzer::from_config(&config_for(&server, &data_dir)).expect("analyzer");
    let models = analyzer.list_models().await;

    assert_eq!(models.len(), 1);
    assert_eq!(models[0].name, "llama3.1:8b");
    assert_eq!(
        serde_json::to_value(models[0].category).expect("category"),
        json!("medium")
    );
}
