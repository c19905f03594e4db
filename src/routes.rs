use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::debug;

use crate::analytics::AnalyticsSummary;
use crate::catalog::CallDuration;
use crate::error::ApiError;
use crate::orchestrator::{
    CompleteCallRequest, CompleteCallResponse, StartCallRequest, StartCallResponse,
};
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/api/health", get(health_check))
        .route("/api/santa/start-call", post(start_call))
        .route("/api/santa/complete-call", post(complete_call))
        .route("/api/santa/analytics", get(get_analytics))
        .route("/api/santa/arcs/:duration", get(get_arc))
        .with_state(state)
}

async fn service_info() -> Json<serde_json::Value> {
    Json(json!({
        "service": "santa-api",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Backend service for personalized Santa video calls",
        "endpoints": {
            "POST /api/santa/start-call": "Initialize a new Santa call",
            "POST /api/santa/complete-call": "Record call completion and analytics",
            "GET /api/santa/analytics": "Get call analytics",
            "GET /api/santa/arcs/{duration}": "Inspect a conversation arc",
            "GET /api/health": "Health check"
        }
    }))
}

async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    debug!("Health check requested");

    let tavus_reachable = match &state.config.tavus_api_key {
        Some(api_key) => state.tavus.probe_reachable(api_key).await,
        None => false,
    };

    let mut available_durations: Vec<&str> =
        state.catalog.arcs.keys().map(CallDuration::as_str).collect();
    available_durations.sort_unstable();

    Json(json!({
        "status": "healthy",
        "service": "santa-api",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "configuration": {
            "tavus_api_key_configured": state.config.tavus_api_key.is_some(),
            "tavus_persona_id_configured": state.config.tavus_persona_id.is_some(),
            "arcs_loaded": !state.catalog.arcs.is_empty(),
            "available_durations": available_durations,
        },
        "tavus_api_reachable": tavus_reachable,
        "total_calls_tracked": state.analytics.started_count().await,
    }))
}

async fn start_call(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartCallRequest>,
) -> Result<Json<StartCallResponse>, ApiError> {
    let call = request.validate()?;
    let response = state.orchestrator.start_call(call).await?;
    Ok(Json(response))
}

async fn complete_call(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompleteCallRequest>,
) -> Result<Json<CompleteCallResponse>, ApiError> {
    Ok(Json(state.orchestrator.complete_call(request)?))
}

async fn get_analytics(State(state): State<Arc<AppState>>) -> Json<AnalyticsSummary> {
    Json(state.analytics.summarize().await)
}

async fn get_arc(
    State(state): State<Arc<AppState>>,
    Path(duration): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let duration = duration
        .parse::<CallDuration>()
        .map_err(ApiError::Validation)?;

    let arc = state
        .catalog
        .arcs
        .get(&duration)
        .ok_or_else(|| ApiError::NotFound("Arc not found".to_string()))?;
    let timing = state
        .catalog
        .timing_guidelines
        .get(&duration)
        .ok_or_else(|| ApiError::NotFound("Timing guidelines not found".to_string()))?;

    Ok(Json(json!({
        "duration": duration,
        "arc": arc,
        "timing_guidelines": timing,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{AnalyticsRecorder, AnalyticsStore};
    use crate::catalog::ArcCatalog;
    use crate::config::AppConfig;
    use crate::orchestrator::CallOrchestrator;
    use crate::tavus::TavusClient;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use std::time::Duration;
    use tower::ServiceExt;

    // Port 9 (discard) refuses connections, so provider calls fail fast
    // without reaching any real network service.
    const UNREACHABLE_BASE_URL: &str = "http://127.0.0.1:9";

    fn test_state(with_credentials: bool) -> Arc<AppState> {
        let config = AppConfig {
            tavus_api_key: with_credentials.then(|| "test-key".to_string()),
            tavus_persona_id: with_credentials.then(|| "test-persona".to_string()),
            tavus_base_url: UNREACHABLE_BASE_URL.to_string(),
            catalog_path: "conversation-arcs.yaml".to_string(),
            port: 0,
        };
        let catalog = Arc::new(
            ArcCatalog::from_yaml(include_str!("../conversation-arcs.yaml")).unwrap(),
        );
        let analytics = Arc::new(AnalyticsStore::new());
        let recorder = AnalyticsRecorder::spawn(analytics.clone());
        let tavus = TavusClient::new(UNREACHABLE_BASE_URL);
        let orchestrator = CallOrchestrator::new(
            config.clone(),
            catalog.clone(),
            tavus.clone(),
            recorder,
        );

        Arc::new(AppState {
            config,
            catalog,
            tavus,
            analytics,
            orchestrator,
        })
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn service_info_lists_endpoints() {
        let app = router(test_state(true));
        let response = app.oneshot(get_request("/")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["service"], "santa-api");
        assert!(body["endpoints"]["POST /api/santa/start-call"].is_string());
    }

    #[tokio::test]
    async fn health_reports_configuration_flags() {
        let app = router(test_state(false));
        let response = app.oneshot(get_request("/api/health")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["configuration"]["tavus_api_key_configured"], false);
        assert_eq!(body["configuration"]["arcs_loaded"], true);
        assert_eq!(
            body["configuration"]["available_durations"],
            serde_json::json!(["10min", "5min"])
        );
        assert_eq!(body["tavus_api_reachable"], false);
        assert_eq!(body["total_calls_tracked"], 0);
    }

    #[tokio::test]
    async fn start_call_rejects_unknown_duration_before_any_provider_call() {
        let app = router(test_state(true));
        let response = app
            .oneshot(post_json(
                "/api/santa/start-call",
                serde_json::json!({
                    "child_name": "Mia",
                    "child_age": 6,
                    "call_duration": "7min",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], true);
        assert_eq!(body["status_code"], 400);
        assert_eq!(body["message"], "call_duration must be '5min' or '10min'");
    }

    #[tokio::test]
    async fn start_call_rejects_out_of_range_age() {
        let app = router(test_state(true));
        let response = app
            .oneshot(post_json(
                "/api/santa/start-call",
                serde_json::json!({
                    "child_name": "Mia",
                    "child_age": 13,
                    "call_duration": "5min",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn start_call_without_credentials_is_a_configuration_error() {
        let app = router(test_state(false));
        let response = app
            .oneshot(post_json(
                "/api/santa/start-call",
                serde_json::json!({
                    "child_name": "Mia",
                    "child_age": 6,
                    "call_duration": "5min",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(body["message"]
            .as_str()
            .unwrap()
            .contains("credentials not configured"));
    }

    #[tokio::test]
    async fn start_call_with_unreachable_provider_is_service_unavailable() {
        let app = router(test_state(true));
        let response = app
            .oneshot(post_json(
                "/api/santa/start-call",
                serde_json::json!({
                    "child_name": "Mia",
                    "child_age": 6,
                    "call_duration": "5min",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn complete_call_acknowledges_and_feeds_analytics() {
        let state = test_state(true);
        let app = router(state.clone());

        let response = app
            .oneshot(post_json(
                "/api/santa/complete-call",
                serde_json::json!({
                    "conversation_id": "c42",
                    "actual_duration_seconds": 240,
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["conversation_id"], "c42");

        // Recording is fire-and-forget; wait for the drain task.
        for _ in 0..100 {
            if state.analytics.summarize().await.average_duration_seconds > 0.0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let summary = state.analytics.summarize().await;
        assert_eq!(summary.average_duration_seconds, 240.0);
        assert_eq!(summary.average_rating, 0.0);
    }

    #[tokio::test]
    async fn complete_call_rejects_rating_outside_range() {
        let app = router(test_state(true));
        let response = app
            .oneshot(post_json(
                "/api/santa/complete-call",
                serde_json::json!({
                    "conversation_id": "c42",
                    "actual_duration_seconds": 240,
                    "parent_rating": 6,
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn analytics_starts_empty() {
        let app = router(test_state(true));
        let response = app.oneshot(get_request("/api/santa/analytics")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["total_calls"], 0);
        assert_eq!(body["calls_today"], 0);
        assert_eq!(body["average_duration_seconds"], 0.0);
        assert_eq!(body["average_rating"], 0.0);
    }

    #[tokio::test]
    async fn arc_inspection_returns_arc_and_timing() {
        let app = router(test_state(true));
        let response = app.oneshot(get_request("/api/santa/arcs/5min")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["duration"], "5min");
        assert_eq!(body["arc"]["total_duration_seconds"], 300);
        assert!(body["timing_guidelines"]["average_response_length_seconds"].is_number());
    }

    #[tokio::test]
    async fn arc_inspection_rejects_unknown_duration() {
        let app = router(test_state(true));
        let response = app.oneshot(get_request("/api/santa/arcs/7min")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn arc_inspection_reports_missing_catalog_entry() {
        let state = test_state(true);
        // Startup validation normally guarantees both arcs; drop one to
        // exercise the 404 branch.
        let mut catalog =
            ArcCatalog::from_yaml(include_str!("../conversation-arcs.yaml")).unwrap();
        catalog.arcs.remove(&CallDuration::TenMin);
        let state = Arc::new(AppState {
            catalog: Arc::new(catalog),
            config: state.config.clone(),
            tavus: state.tavus.clone(),
            analytics: state.analytics.clone(),
            orchestrator: CallOrchestrator::new(
                state.config.clone(),
                state.catalog.clone(),
                state.tavus.clone(),
                AnalyticsRecorder::spawn(state.analytics.clone()),
            ),
        });

        let app = router(state);
        let response = app.oneshot(get_request("/api/santa/arcs/10min")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
