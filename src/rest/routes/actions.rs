//! Execute a workflow action.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::process::{ActionDispatcher, ActionResult, DispatchError};
use crate::rest::dto::{ActionRequest, ActionResponse};
use crate::rest::error::ApiError;
use crate::rest::state::ApiState;

/// Run an action against one entity.
///
/// Undefined process/action pairs answer 404 without touching the backend.
/// Otherwise the body is always the `{success, data | navigate | error}`
/// envelope: 200 on success, 400 for a rejected payload, 502 when the
/// backend call failed.
#[utoipa::path(
    post,
    path = "/api/v1/processes/{process}/actions/{action}",
    tag = "Actions",
    params(
        ("process" = String, Path, description = "Process key, e.g. payment"),
        ("action" = String, Path, description = "Action code, e.g. RECORD_PAYMENT")
    ),
    request_body = ActionRequest,
    responses(
        (status = 200, description = "Action succeeded", body = ActionResponse),
        (status = 400, description = "Payload rejected", body = ActionResponse),
        (status = 404, description = "Undefined action", body = crate::rest::error::ErrorResponse),
        (status = 502, description = "Backend failure", body = ActionResponse)
    )
)]
pub async fn execute(
    State(state): State<ApiState>,
    Path((process, action)): Path<(String, String)>,
    Json(request): Json<ActionRequest>,
) -> Result<(StatusCode, Json<ActionResponse>), ApiError> {
    let typed = ActionDispatcher::resolve(&process, &action)
        .map_err(|e| ApiError::NotFound(e.to_string()))?;

    info!(action = %typed, entity_id = request.entity_id, "Action requested over REST");
    let result = state
        .dispatcher
        .execute(typed, request.entity_id, &request.payload)
        .await;

    let status = match result {
        Ok(_) => StatusCode::OK,
        Err(DispatchError::Backend(_)) => StatusCode::BAD_GATEWAY,
        Err(_) => StatusCode::BAD_REQUEST,
    };
    let config = state.config.clone();
    let response = ActionResponse::new(ActionResult::from(result), |url| config.web_link(url));
    Ok((status, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackend};
    use crate::config::Config;
    use serde_json::json;
    use std::sync::Arc;

    fn call(
        mock: &MockBackend,
        process: &str,
        action: &str,
        body: serde_json::Value,
    ) -> impl std::future::Future<Output = Result<(StatusCode, Json<ActionResponse>), ApiError>>
    {
        let mut config = Config::default();
        config.ui.web_base_url = Some("https://crm.example.com".to_string());
        let state = ApiState::new(config, Arc::new(mock.clone()));
        let request: ActionRequest = serde_json::from_value(body).unwrap();
        execute(
            State(state),
            Path((process.to_string(), action.to_string())),
            Json(request),
        )
    }

    #[tokio::test]
    async fn test_execute_success() {
        let mock = MockBackend::new();
        mock.respond(
            "crm_record_payment",
            json!({"success": true, "payment": {"id": 42, "status": "paid"}}),
        );
        let (status, Json(resp)) = call(
            &mock,
            "payment",
            "RECORD_PAYMENT",
            json!({"entity_id": 42, "payload": {"payment_method": "cash"}}),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::OK);
        assert!(resp.success);
        assert_eq!(resp.data.unwrap()["payment"]["status"], json!("paid"));
        assert_eq!(
            mock.tool_calls(),
            vec![(
                "crm_record_payment".to_string(),
                json!({"payment_id": 42, "payment_method": "cash", "notes": ""})
            )]
        );
    }

    #[tokio::test]
    async fn test_undefined_action_is_not_found() {
        let mock = MockBackend::new();
        let err = call(&mock, "renewal", "NON_EXISTENT", json!({"entity_id": 1}))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "未定義的行動: renewal.NON_EXISTENT"));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_payload_and_backend_failure() {
        let mock = MockBackend::new();
        let (status, Json(resp)) = call(&mock, "payment", "WAIVE_PAYMENT", json!({"entity_id": 1}))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!resp.success);
        assert!(mock.calls().is_empty());

        mock.fail_tool("commission_approve", BackendError::Network("timeout".into()));
        let (status, Json(resp)) = call(&mock, "commission", "APPROVE", json!({"entity_id": 5}))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(resp.error.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_navigation_carries_link() {
        let mock = MockBackend::new();
        let (status, Json(resp)) = call(
            &mock,
            "invoice",
            "FILL_TAX_ID",
            json!({"entity_id": 9, "payload": {"customer_id": 12}}),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::OK);
        let nav = resp.navigate.unwrap();
        assert_eq!(nav.url, "/customers/12?focus=tax_id");
        assert_eq!(nav.link, "https://crm.example.com/customers/12?focus=tax_id");
        assert!(mock.calls().is_empty());
    }
}
