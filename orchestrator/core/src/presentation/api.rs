// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;

use crate::application::pipeline::{DispatchPipeline, PipelineError};
use crate::domain::provider::ProviderDescriptor;

pub struct AppState {
    pub pipeline: Arc<DispatchPipeline>,
    pub flatten_output: bool,
    pub started_at: DateTime<Utc>,
    pub start_time: Instant,
}

pub fn app(pipeline: Arc<DispatchPipeline>, flatten_output: bool) -> Router {
    let state = Arc::new(AppState {
        pipeline,
        flatten_output,
        started_at: Utc::now(),
        start_time: Instant::now(),
    });

    Router::new()
        .route("/query", post(query_handler))
        .route("/agents", get(agents_handler))
        .route("/health", get(health_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Collapse multi-line text into one paragraph: non-empty trimmed lines joined by spaces.
pub fn flatten_paragraph(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

async fn query_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<QueryRequest>,
) -> Response {
    match state
        .pipeline
        .handle_request(&payload.message, payload.session_id.as_deref())
        .await
    {
        Ok(mut response) => {
            if state.flatten_output {
                response.fused = flatten_paragraph(&response.fused);
            }
            Json(response).into_response()
        }
        Err(PipelineError::Fusion(e)) => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}

async fn agents_handler(State(state): State<Arc<AppState>>) -> Json<Vec<ProviderDescriptor>> {
    Json(state.pipeline.registry().list_all().to_vec())
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let checks = state.pipeline.models().health_check_all().await;
    let all_healthy = checks.values().all(Result::is_ok);
    let llm_providers: serde_json::Map<String, serde_json::Value> = checks
        .into_iter()
        .map(|(name, result)| {
            let status = match result {
                Ok(()) => "healthy".to_string(),
                Err(e) => format!("unhealthy: {}", e),
            };
            (name, json!(status))
        })
        .collect();

    Json(json!({
        "status": if all_healthy { "healthy" } else { "degraded" },
        "agents": state.pipeline.registry().len(),
        "llm_providers": llm_providers,
        "started_at": state.started_at.to_rfc3339(),
        "uptime_seconds": state.start_time.elapsed().as_secs(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{Dispatcher, Fuser, PipelineSettings, Selector};
    use crate::domain::dispatch_config::TimeoutPolicy;
    use crate::domain::llm::{GenerationOptions, GenerationResponse, LLMError, LLMProvider, TextGenerator};
    use crate::infrastructure::llm::ProviderRegistry;
    use crate::domain::provider::{Immediate, ProviderError, ProviderOutput, SyncProvider};
    use crate::domain::registry::AgentRegistry;
    use crate::infrastructure::providers::ProviderArena;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    struct Report;

    impl SyncProvider for Report {
        fn process(&self, _query: &str) -> Result<ProviderOutput, ProviderError> {
            Ok("line one\n\n   line two  \n".into())
        }
    }

    struct Offline;

    #[async_trait]
    impl TextGenerator for Offline {
        async fn generate_text(&self, _prompt: &str) -> Result<String, LLMError> {
            Err(LLMError::Network("connection refused".into()))
        }
    }

    struct Endpoint {
        reachable: bool,
    }

    #[async_trait]
    impl LLMProvider for Endpoint {
        async fn generate(&self, _prompt: &str, _options: &GenerationOptions) -> Result<GenerationResponse, LLMError> {
            Err(LLMError::Provider("not used".into()))
        }

        async fn health_check(&self) -> Result<(), LLMError> {
            if self.reachable {
                Ok(())
            } else {
                Err(LLMError::Network("connection refused".into()))
            }
        }
    }

    fn pipeline(fuser: Fuser) -> Arc<DispatchPipeline> {
        Arc::new(build_pipeline(fuser))
    }

    fn build_pipeline(fuser: Fuser) -> DispatchPipeline {
        let registry = Arc::new(
            AgentRegistry::new(vec![ProviderDescriptor::new("cost", &["cost", "spend"], "echo")
                .with_description("Monthly spend")])
            .unwrap(),
        );
        let mut arena = ProviderArena::new();
        arena.insert("cost", Arc::new(Immediate(Report)));
        DispatchPipeline::new(
            Selector::new(registry, None),
            Dispatcher::new(Arc::new(arena), TimeoutPolicy::Discard),
            fuser,
            PipelineSettings {
                top_k: 3,
                time_budget: Duration::from_secs(1),
                use_memory: false,
                memory_capacity: 10,
            },
        )
    }

    async fn fetch_json(router: Router, uri: &str) -> serde_json::Value {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        body_json(response).await
    }

    fn query(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_flatten_paragraph() {
        assert_eq!(flatten_paragraph("  a\n\n b \r\nc\n"), "a b c");
        assert_eq!(flatten_paragraph(""), "");
    }

    #[tokio::test]
    async fn test_query_returns_flattened_response() {
        let router = app(pipeline(Fuser::deterministic()), true);
        let response = router
            .oneshot(query(r#"{"message": "what is my spend", "sessionId": "s1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["agentsCalled"], json!(["cost"]));
        assert_eq!(body["responses"][0]["providerName"], "cost");
        assert_eq!(body["fused"], "[cost] line one line two");
    }

    #[tokio::test]
    async fn test_query_without_flattening_keeps_newlines() {
        let router = app(pipeline(Fuser::deterministic()), false);
        let response = router.oneshot(query(r#"{"message": "spend"}"#)).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["fused"], "[cost] line one\n\n   line two  \n");
    }

    #[tokio::test]
    async fn test_fusion_failure_is_bad_gateway() {
        let router = app(pipeline(Fuser::synthesis(Arc::new(Offline))), true);
        let response = router.oneshot(query(r#"{"message": "spend"}"#)).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_agents_and_health() {
        let router = app(pipeline(Fuser::deterministic()), true);

        let body = fetch_json(router.clone(), "/agents").await;
        assert_eq!(body[0]["name"], "cost");
        assert_eq!(body[0]["description"], "Monthly spend");
        assert_eq!(body[0]["capabilityTags"], json!(["cost", "spend"]));

        let body = fetch_json(router, "/health").await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["agents"], 1);
        assert_eq!(body["llm_providers"], json!({}));
    }

    #[tokio::test]
    async fn test_health_reports_llm_providers() {
        let mut models = ProviderRegistry::empty();
        models.register("local", Arc::new(Endpoint { reachable: true }), ["fast".to_string()]);
        models.register("remote", Arc::new(Endpoint { reachable: false }), ["smart".to_string()]);
        let pipeline = build_pipeline(Fuser::deterministic()).with_models(Arc::new(models));

        let body = fetch_json(app(Arc::new(pipeline), true), "/health").await;
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["llm_providers"]["local"], "healthy");
        assert_eq!(
            body["llm_providers"]["remote"],
            "unhealthy: Network error: connection refused"
        );
    }
}
