//! REST API over the workflow layer.
//!
//! Exposes the action availability map, kanban queues, single workspaces
//! and action dispatch so scripts and other consoles can drive the same
//! workflows as the TUI. Every route shares one [`ApiState`].

use std::net::SocketAddr;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod dto;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::ApiState;

/// Build the API router with all routes
pub fn build_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(routes::health::health))
        .route("/api/v1/openapi.json", get(openapi::openapi_json))
        // Processes
        .route("/api/v1/processes", get(routes::processes::list))
        .route(
            "/api/v1/processes/:process/:entity_id",
            get(routes::processes::workspace),
        )
        .route(
            "/api/v1/processes/:process/actions/:action",
            post(routes::actions::execute),
        )
        // Queue
        .route("/api/v1/queue/kanban", get(routes::queue::kanban))
        .route("/api/v1/queue/stats", get(routes::queue::stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the REST API server
pub async fn serve(state: ApiState, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!("REST API listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockBackend;
    use crate::config::Config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn router(mock: &MockBackend) -> Router {
        build_router(ApiState::new(Config::default(), Arc::new(mock.clone())))
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_route() {
        let response = router(&MockBackend::new())
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["backend"], json!("mock"));
    }

    #[tokio::test]
    async fn test_workspace_and_action_routes_coexist() {
        let mock = MockBackend::new();
        mock.set_rows(
            "v_commission_queue",
            vec![json!({"commission_id": 3, "blocked_by": "pending_approval"})],
        );

        let response = router(&mock)
            .oneshot(
                Request::get("/api/v1/processes/commission/3")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["entity_id"], json!(3));

        let response = router(&mock)
            .oneshot(
                Request::post("/api/v1/processes/commission/actions/APPROVE")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"entity_id": 3}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["success"], json!(true));
        assert_eq!(mock.tool_calls()[0].0, "commission_approve");
    }

    #[tokio::test]
    async fn test_undefined_action_route_is_404() {
        let mock = MockBackend::new();
        let response = router(&mock)
            .oneshot(
                Request::post("/api/v1/processes/renewal/actions/NON_EXISTENT")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"entity_id": 1}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], json!("not_found"));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_openapi_route() {
        let response = router(&MockBackend::new())
            .oneshot(
                Request::get("/api/v1/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let doc = body_json(response).await;
        assert!(doc["paths"]["/api/v1/queue/stats"].is_object());
    }
}
