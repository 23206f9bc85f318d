//! Kanban board and header counts.

use axum::{
    extract::{Query, State},
    Json,
};
use std::collections::BTreeMap;

use crate::process::{DashboardStats, ProcessKey};
use crate::rest::dto::{KanbanBoardResponse, KanbanQuery, ProcessStatsResponse};
use crate::rest::error::ApiError;
use crate::rest::state::ApiState;

use super::processes::parse_process;

fn requested_processes(state: &ApiState, query: &KanbanQuery) -> Result<Vec<ProcessKey>, ApiError> {
    match query.processes.as_deref().map(str::trim) {
        None | Some("") => Ok(state.config.kanban.processes.clone()),
        Some(list) => list
            .split(',')
            .map(|p| parse_process(p.trim()))
            .collect(),
    }
}

/// Every requested queue, one column per workflow.
///
/// A column whose view fails carries `error` and no items; the board
/// itself still answers 200.
#[utoipa::path(
    get,
    path = "/api/v1/queue/kanban",
    tag = "Queue",
    params(KanbanQuery),
    responses(
        (status = 200, description = "Kanban board data", body = KanbanBoardResponse),
        (status = 404, description = "Unknown process in filter", body = crate::rest::error::ErrorResponse)
    )
)]
pub async fn kanban(
    State(state): State<ApiState>,
    Query(query): Query<KanbanQuery>,
) -> Result<Json<KanbanBoardResponse>, ApiError> {
    let processes = requested_processes(&state, &query)?;
    let board = state.queue.fetch_board(&processes, &query.filter()).await;
    Ok(Json(KanbanBoardResponse::from(&board)))
}

/// Header counts per workflow
#[utoipa::path(
    get,
    path = "/api/v1/queue/stats",
    tag = "Queue",
    params(KanbanQuery),
    responses(
        (status = 200, description = "Counts keyed by process", body = BTreeMap<String, ProcessStatsResponse>),
        (status = 502, description = "Backend failure", body = crate::rest::error::ErrorResponse)
    )
)]
pub async fn stats(
    State(state): State<ApiState>,
    Query(query): Query<KanbanQuery>,
) -> Result<Json<BTreeMap<String, ProcessStatsResponse>>, ApiError> {
    let stats: DashboardStats = state.queue.fetch_stats(&query.filter()).await?;
    Ok(Json(
        stats
            .processes
            .into_iter()
            .map(|(process, s)| (process.as_str().to_string(), s.into()))
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackend};
    use crate::config::Config;
    use serde_json::json;
    use std::sync::Arc;

    fn query(processes: Option<&str>) -> KanbanQuery {
        KanbanQuery {
            branch_id: None,
            include_completed: None,
            processes: processes.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_kanban_keeps_failed_columns() {
        let mock = MockBackend::new();
        mock.set_rows(
            "v_payment_queue",
            vec![json!({"payment_id": 1, "blocked_by": "overdue", "priority": "high"})],
        );
        mock.fail_table("v_invoice_queue", BackendError::Network("timeout".into()));
        let state = ApiState::new(Config::default(), Arc::new(mock));

        let Json(board) = kanban(State(state), Query(query(Some("payment, invoice"))))
            .await
            .unwrap();
        assert_eq!(board.columns.len(), 2);
        assert_eq!(board.total_count, 1);
        assert_eq!(board.columns[0].items[0].decision.priority, "high");
        assert!(board.columns[1].error.is_some());
    }

    #[tokio::test]
    async fn test_kanban_defaults_to_configured_board() {
        let state = ApiState::new(Config::default(), Arc::new(MockBackend::new()));
        let Json(board) = kanban(State(state), Query(query(None))).await.unwrap();
        assert_eq!(board.columns.len(), ProcessKey::all().len());
    }

    #[tokio::test]
    async fn test_kanban_rejects_unknown_process() {
        let state = ApiState::new(Config::default(), Arc::new(MockBackend::new()));
        let err = kanban(State(state), Query(query(Some("payment,quote"))))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_stats() {
        let mock = MockBackend::new();
        mock.set_rows(
            "v_process_dashboard_stats",
            vec![json!({"process": "renewal", "total": 4, "overdue": 1, "urgent": 2})],
        );
        let state = ApiState::new(Config::default(), Arc::new(mock));
        let Json(stats) = stats(State(state), Query(query(None))).await.unwrap();
        assert_eq!(stats["renewal"].total, 4);
        assert_eq!(stats["renewal"].urgent, 2);
    }
}
