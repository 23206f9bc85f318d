//! Workflow catalogue and single-workspace lookup.

use axum::{
    extract::{Path, State},
    Json,
};

use crate::process::ProcessKey;
use crate::rest::dto::{ProcessInfo, WorkspaceResponse};
use crate::rest::error::ApiError;
use crate::rest::state::ApiState;

pub(crate) fn parse_process(process: &str) -> Result<ProcessKey, ApiError> {
    process.parse().map_err(ApiError::NotFound)
}

/// Every workflow with its actions and their payload fields
#[utoipa::path(
    get,
    path = "/api/v1/processes",
    tag = "Processes",
    responses(
        (status = 200, description = "Action availability map", body = Vec<ProcessInfo>)
    )
)]
pub async fn list() -> Json<Vec<ProcessInfo>> {
    Json(
        ProcessKey::all()
            .iter()
            .copied()
            .map(ProcessInfo::from)
            .collect(),
    )
}

/// One workflow instance with its decision, timeline and raw row
#[utoipa::path(
    get,
    path = "/api/v1/processes/{process}/{entity_id}",
    tag = "Processes",
    params(
        ("process" = String, Path, description = "Process key, e.g. payment"),
        ("entity_id" = i64, Path, description = "Entity id within the process")
    ),
    responses(
        (status = 200, description = "Workspace", body = WorkspaceResponse),
        (status = 404, description = "Unknown process or entity", body = crate::rest::error::ErrorResponse),
        (status = 502, description = "Backend failure", body = crate::rest::error::ErrorResponse)
    )
)]
pub async fn workspace(
    State(state): State<ApiState>,
    Path((process, entity_id)): Path<(String, i64)>,
) -> Result<Json<WorkspaceResponse>, ApiError> {
    let process = parse_process(&process)?;
    let item = state
        .queue
        .fetch_one(process, entity_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("找不到{} #{}", process.display_name(), entity_id))
        })?;
    Ok(Json(WorkspaceResponse::from(&item)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackend};
    use crate::config::Config;
    use serde_json::json;
    use std::sync::Arc;

    fn state(mock: &MockBackend) -> ApiState {
        ApiState::new(Config::default(), Arc::new(mock.clone()))
    }

    #[tokio::test]
    async fn test_list_covers_every_process() {
        let Json(processes) = list().await;
        assert_eq!(processes.len(), ProcessKey::all().len());
        assert!(processes
            .iter()
            .any(|p| p.key == "termination" && p.actions.iter().any(|a| a.code == "SETTLE_DEPOSIT")));
    }

    #[tokio::test]
    async fn test_workspace_found() {
        let mock = MockBackend::new();
        mock.set_rows(
            "v_termination_queue",
            vec![
                json!({"case_id": 1, "blocked_by": "awaiting_inspection"}),
                json!({"case_id": 2, "blocked_by": "deposit_pending"}),
            ],
        );
        let Json(resp) = workspace(
            State(state(&mock)),
            Path(("termination".to_string(), 2)),
        )
        .await
        .unwrap();
        assert_eq!(resp.item.entity_id, 2);
        assert_eq!(resp.row["blocked_by"], json!("deposit_pending"));
    }

    #[tokio::test]
    async fn test_workspace_errors() {
        let mock = MockBackend::new();
        let err = workspace(State(state(&mock)), Path(("quote".to_string(), 1)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));

        let err = workspace(State(state(&mock)), Path(("payment".to_string(), 9)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m.contains("#9")));

        mock.fail_table("v_payment_queue", BackendError::Network("timeout".into()));
        let err = workspace(State(state(&mock)), Path(("payment".to_string(), 9)))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }
}
