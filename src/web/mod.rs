use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;
use tracing::{info, warn};

use crate::state::AppState;

const DEFAULT_WEB_USER: &str = "web_user";

fn default_user_id() -> String {
    DEFAULT_WEB_USER.to_string()
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(rename = "userId", alias = "user_id", default = "default_user_id")]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(rename = "userId")]
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

pub fn build_router(state: AppState) -> Router {
    let static_dir = state.config.web_static_dir.clone();
    let router = Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/api/chat", post(chat))
        .with_state(state);

    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "Gemini AI Web App",
    })
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            warn!("Rejected web chat body: {}", rejection.body_text());
            return error_response(rejection.status(), rejection.body_text());
        }
    };
    if payload.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "No message provided".to_string());
    }

    info!(user_id = %payload.user_id, "Web chat request");
    match state.relay.chat(&payload.message).await {
        Ok(response) => (
            StatusCode::OK,
            Json(ChatResponse {
                response,
                user_id: payload.user_id,
            }),
        )
            .into_response(),
        Err(err) => {
            warn!(user_id = %payload.user_id, "Web chat failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

pub async fn serve(state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", state.config.web_bind_addr, state.config.web_port)
        .parse()
        .with_context(|| {
            format!(
                "invalid web bind address {}:{}",
                state.config.web_bind_addr, state.config.web_port
            )
        })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind web server on {addr}"))?;
    info!("Web server listening on http://{addr}");

    axum::serve(listener, build_router(state))
        .await
        .context("web server stopped unexpectedly")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::ads::AdService;
    use crate::config::Config;
    use crate::llm::{CompletionBackend, ContentPart};
    use crate::network::{DeploymentContext, HostAddress};
    use crate::relay::testing::StubBackend;

    fn state_with(backend: Arc<dyn CompletionBackend>, env: &[(&str, &str)]) -> AppState {
        let env: HashMap<String, String> = env
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let config = Config::from_source(&env).unwrap();
        let deployment = DeploymentContext::local(
            HostAddress::Detected(IpAddr::V4(Ipv4Addr::new(10, 1, 1, 5))),
            "Office",
            config.web_port,
        );
        let ads = Arc::new(AdService::new(config.ad_settings(), Arc::new(deployment)));
        AppState::new(Arc::new(config), ads, backend)
    }

    async fn post_raw(
        app: Router,
        uri: &str,
        content_type: Option<&str>,
        body: String,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method("POST").uri(uri);
        if let Some(content_type) = content_type {
            request = request.header("content-type", content_type);
        }
        let response = app
            .oneshot(request.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        post_raw(app, uri, Some("application/json"), body.to_string()).await
    }

    #[tokio::test]
    async fn health_reports_service_name() {
        let app = build_router(state_with(Arc::new(StubBackend::replying("x")), &[]));
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"status": "healthy", "service": "Gemini AI Web App"}));
    }

    #[tokio::test]
    async fn chat_echoes_user_id_and_accepts_snake_case_alias() {
        let app = build_router(state_with(
            Arc::new(StubBackend::replying("hi there")),
            &[("AD_ENABLED", "false")],
        ));

        let (status, body) =
            post_json(app.clone(), "/chat", json!({"message": "hello", "userId": "u-1"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"response": "hi there", "userId": "u-1"}));

        let (status, body) =
            post_json(app.clone(), "/api/chat", json!({"message": "hello", "user_id": "u-2"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["userId"], "u-2");

        let (_, body) = post_json(app, "/chat", json!({"message": "hello"})).await;
        assert_eq!(body["userId"], DEFAULT_WEB_USER);
    }

    #[tokio::test]
    async fn empty_message_is_rejected_without_backend_call() {
        let backend = Arc::new(StubBackend::replying("unused"));
        let app = build_router(state_with(backend.clone(), &[]));

        let (status, body) = post_json(app, "/chat", json!({"message": "   "})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No message provided");
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn malformed_bodies_get_json_errors() {
        let backend = Arc::new(StubBackend::replying("unused"));
        let app = build_router(state_with(backend.clone(), &[]));

        let (status, body) = post_raw(
            app.clone(),
            "/chat",
            Some("application/json"),
            "{not json".to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("JSON"));

        let (status, body) =
            post_json(app.clone(), "/chat", json!({"message": "hi", "userId": 123})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());

        let (status, body) = post_raw(
            app,
            "/api/chat",
            None,
            json!({"message": "hi"}).to_string(),
        )
        .await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body["error"].as_str().unwrap().contains("Content-Type"));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn chat_forwards_message_untrimmed() {
        let backend = Arc::new(StubBackend::replying("ok"));
        let app = build_router(state_with(backend.clone(), &[("AD_ENABLED", "false")]));

        let (status, _) = post_json(app, "/chat", json!({"message": "  two lines\n"})).await;
        assert_eq!(status, StatusCode::OK);
        let calls = backend.calls.lock();
        assert!(matches!(&calls[0].parts[0], ContentPart::Text(text) if text == "  two lines\n"));
    }

    #[tokio::test]
    async fn backend_failure_maps_to_internal_error() {
        let app = build_router(state_with(Arc::new(StubBackend::failing()), &[]));
        let (status, body) = post_json(app, "/chat", json!({"message": "hello"})).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn web_turns_share_the_ad_cadence() {
        let app = build_router(state_with(
            Arc::new(StubBackend::replying("ok")),
            &[("AD_FREQUENCY", "1"), ("AD_WEB_APP_URL", "https://example.com/")],
        ));
        let (_, body) = post_json(app, "/chat", json!({"message": "hello"})).await;
        let response = body["response"].as_str().unwrap();
        assert!(response.starts_with("ok\n\n🤖"));
        assert!(response.contains("https://example.com/"));
    }

    #[tokio::test]
    async fn static_dir_serves_other_paths() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>chat</h1>").unwrap();
        let static_dir = dir.path().to_string_lossy().to_string();
        let app = build_router(state_with(
            Arc::new(StubBackend::replying("x")),
            &[("WEB_STATIC_DIR", static_dir.as_str())],
        ));

        let response = app
            .oneshot(Request::builder().uri("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"<h1>chat</h1>");
    }
}
