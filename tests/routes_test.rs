#![cfg(feature = "server")]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt; // for `oneshot`

use munin::{
    GenerateOptions, ModelLoader, MuninError, PipelineConfig, PointCache, PointService,
    ReadinessGate, Result, Synthesizer, TextGenerator,
};

struct ListGenerator;

#[async_trait]
impl TextGenerator for ListGenerator {
    fn name(&self) -> &str {
        "list"
    }

    async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<String> {
        Ok("1. reduces emissions\n2. lowers cost\n3. is renewable".into())
    }
}

struct ListLoader;

#[async_trait]
impl ModelLoader for ListLoader {
    async fn load(&self) -> Result<Arc<dyn TextGenerator>> {
        Ok(Arc::new(ListGenerator) as Arc<dyn TextGenerator>)
    }
}

/// Generator whose list changes on every call.
#[derive(Default)]
struct NumberedListGenerator {
    calls: AtomicU32,
}

#[async_trait]
impl TextGenerator for NumberedListGenerator {
    fn name(&self) -> &str {
        "numbered"
    }

    async fn generate(&self, _prompt: &str, _options: &GenerateOptions) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(format!(
            "1. cuts emissions in round {call}\n2. lowers costs in round {call}\n3. scales well in round {call}"
        ))
    }
}

struct NumberedListLoader(Arc<NumberedListGenerator>);

#[async_trait]
impl ModelLoader for NumberedListLoader {
    async fn load(&self) -> Result<Arc<dyn TextGenerator>> {
        let generator: Arc<dyn TextGenerator> = self.0.clone();
        Ok(generator)
    }
}

struct BrokenLoader;

#[async_trait]
impl ModelLoader for BrokenLoader {
    async fn load(&self) -> Result<Arc<dyn TextGenerator>> {
        Err(MuninError::AuthenticationFailed)
    }
}

fn app(loader: Arc<dyn ModelLoader>) -> Router {
    let service = PointService::new(
        Arc::new(ReadinessGate::new(loader)),
        PointCache::default(),
        Synthesizer::new(PipelineConfig::benefits()),
    );
    munin::server::router(Arc::new(service))
}

fn generate_request(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/generate")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn status_before_first_request() {
    let app = app(Arc::new(ListLoader));
    let request = Request::builder()
        .uri("/api/status")
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "not_loaded");
    assert_eq!(body["cacheSize"], 0);
    assert!(body.get("cacheHitRate").is_none());
}

#[tokio::test]
async fn generate_returns_points() {
    let app = app(Arc::new(ListLoader));

    let (status, body) = send(
        &app,
        generate_request(r#"{"prompt": "solar power", "count": 3}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["topic"], "solar power");
    assert_eq!(body["requestedCount"], 3);
    assert_eq!(body["generatedCount"], 3);
    assert_eq!(
        body["points"],
        json!(["Reduces emissions.", "Lowers cost.", "Is renewable."])
    );
    assert_eq!(body["cached"], false);
    assert!(body["generationTime"].is_u64());
    assert!(body["totalTime"].is_u64());
}

#[tokio::test]
async fn second_identical_request_is_cached() {
    let generator = Arc::new(NumberedListGenerator::default());
    let app = app(Arc::new(NumberedListLoader(generator.clone())));

    let (_, first) = send(
        &app,
        generate_request(r#"{"prompt": "Solar Power", "count": 3}"#),
    )
    .await;
    let (status, second) = send(&app, generate_request(r#"{"prompt": "solar power"}"#)).await;

    assert_eq!(first["cached"], false);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["cached"], true);
    assert_eq!(second["topic"], "solar power");
    assert_eq!(first["points"], second["points"]);
    assert_eq!(first["points"][0], "Cuts emissions in round 1.");
    assert_eq!(generator.calls.load(Ordering::Relaxed), 1);

    let status_request = Request::builder()
        .uri("/api/status")
        .body(Body::empty())
        .unwrap();
    let (_, status_body) = send(&app, status_request).await;
    assert_eq!(status_body["status"], "ready");
    assert_eq!(status_body["cacheSize"], 1);
    assert_eq!(status_body["cacheHitRate"], 0.5);
}

#[tokio::test]
async fn count_is_clamped_and_padded() {
    let app = app(Arc::new(ListLoader));

    let (status, body) = send(
        &app,
        generate_request(r#"{"prompt": "solar power", "count": 99}"#),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requestedCount"], 5);
    assert_eq!(body["generatedCount"], 5);
    assert_eq!(body["points"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn odd_counts_fall_back_to_default_or_truncate() {
    let app = app(Arc::new(ListLoader));

    let (_, body) = send(
        &app,
        generate_request(r#"{"prompt": "solar power", "count": "many"}"#),
    )
    .await;
    assert_eq!(body["requestedCount"], 3);

    let (_, body) = send(
        &app,
        generate_request(r#"{"prompt": "wind power", "count": 2.7}"#),
    )
    .await;
    assert_eq!(body["requestedCount"], 2);

    let (_, body) = send(
        &app,
        generate_request(r#"{"prompt": "hydro power", "count": -4}"#),
    )
    .await;
    assert_eq!(body["requestedCount"], 1);
}

#[tokio::test]
async fn missing_or_blank_prompt_is_bad_request() {
    let app = app(Arc::new(ListLoader));

    for body in [r#"{"count": 3}"#, r#"{"prompt": "   "}"#, r#"{"prompt": null}"#] {
        let (status, body) = send(&app, generate_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Valid prompt is required" }));
    }
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let app = app(Arc::new(ListLoader));

    let (status, body) = send(&app, generate_request("not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Valid prompt is required");
}

#[tokio::test]
async fn load_failure_is_internal_error() {
    let app = app(Arc::new(BrokenLoader));

    let (status, body) = send(
        &app,
        generate_request(r#"{"prompt": "solar power"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("authentication failed"));
    assert!(body["totalTime"].is_u64());
}
