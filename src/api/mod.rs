// src/api/mod.rs — Localhost HTTP sidecar for processes that are not MCP clients

pub mod auth;
pub mod handlers;
pub mod types;

use std::future::Future;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use crate::core::Governor;
use crate::infra::config::SidecarConfig;

/// Shared state for sidecar handlers.
#[derive(Clone)]
pub struct ApiState {
    pub governor: Governor,
    pub token: Option<String>,
}

/// Build the router. Same governor, same guardrails as the MCP tools.
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin([
            HeaderValue::from_static("http://localhost"),
            HeaderValue::from_static("http://127.0.0.1"),
        ])
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/velle_prompt", post(handlers::prompt))
        .route("/velle_status", get(handlers::status))
        .layer(cors)
        .with_state(state)
}

/// Serve on `127.0.0.1:<port>` until `shutdown` resolves.
pub async fn start_sidecar(
    config: &SidecarConfig,
    state: ApiState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = format!("127.0.0.1:{}", config.port);
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("HTTP sidecar listening on http://{addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::testing::MemorySink;
    use crate::audit::LocalOnly;
    use crate::core::clock::SystemClock;
    use crate::infra::config::Config;
    use crate::injector::dry_run::DryRunInjector;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn test_state(token: Option<&str>) -> ApiState {
        let governor = Governor::new(
            Config::default(),
            Arc::new(DryRunInjector::default()),
            Arc::new(LocalOnly::new(Arc::new(MemorySink::default()))),
            Arc::new(SystemClock),
        );
        ApiState {
            governor,
            token: token.map(String::from),
        }
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = build_router(test_state(None));
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["service"], "velle-sidecar");
    }

    #[tokio::test]
    async fn test_prompt_schedules_delivery() {
        let app = build_router(test_state(None));
        let req = Request::builder()
            .method("POST")
            .uri("/velle_prompt")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"text":"new build failed, take a look","delay_ms":0}"#))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "injected");
        assert_eq!(body["turn_count"], 1);
    }

    #[tokio::test]
    async fn test_prompt_missing_text_is_bad_request() {
        let app = build_router(test_state(None));
        let req = Request::builder()
            .method("POST")
            .uri("/velle_prompt")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"reason":"no text"}"#))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["status"], "error");
    }

    #[tokio::test]
    async fn test_prompt_invalid_json_is_bad_request() {
        let app = build_router(test_state(None));
        let req = Request::builder()
            .method("POST")
            .uri("/velle_prompt")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_status_requires_token_when_configured() {
        let app = build_router(test_state(Some("s3cret")));
        let req = Request::builder()
            .uri("/velle_status")
            .body(Body::empty())
            .unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = Request::builder()
            .uri("/velle_status")
            .header("authorization", "Bearer s3cret")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["turn_count"], 0);
        assert_eq!(body["active"], false);
    }
}
