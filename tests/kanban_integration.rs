//! Integration tests for the process kanban
//!
//! Covers queue aggregation over `MockBackend`:
//! - one column per requested process, in request order
//! - client-side ordering within a column
//! - a failing queue view degrading to a column error
//! - header counts from the stats view, and the board fallback
//! - workspace loading by entity id

use std::sync::Arc;

use serde_json::json;

use backoffice::backend::{BackendError, MockBackend, RecordedCall};
use backoffice::config::Config;
use backoffice::process::{
    DashboardStats, ProcessKey, QueueFilter, QueueService, WorkspaceLoader, WorkspaceState,
};

fn service(mock: &MockBackend) -> QueueService {
    QueueService::new(Arc::new(mock.clone()), &Config::default().kanban)
}

fn seed_payments(mock: &MockBackend) {
    mock.set_rows(
        "v_payment_queue",
        vec![
            json!({"payment_id": 1, "customer_name": "Low", "blocked_by": "awaiting_payment",
                   "priority": "low", "due_date": "2026-01-01"}),
            json!({"payment_id": 2, "customer_name": "Late", "blocked_by": "overdue",
                   "priority": "high", "is_overdue": true, "overdue_days": 3}),
            json!({"payment_id": 3, "customer_name": "Later", "blocked_by": "overdue",
                   "priority": "high", "is_overdue": true, "overdue_days": 20}),
            json!({"payment_id": 4, "customer_name": "Fire", "blocked_by": "overdue",
                   "priority": "urgent", "branch_id": 2}),
        ],
    );
}

#[tokio::test]
async fn test_board_columns_follow_request_order() {
    let mock = MockBackend::new();
    seed_payments(&mock);

    let processes = [ProcessKey::Termination, ProcessKey::Payment];
    let board = service(&mock)
        .fetch_board(&processes, &QueueFilter::default())
        .await;

    let order: Vec<_> = board.columns.iter().map(|c| c.process).collect();
    assert_eq!(order, processes);
    assert!(board.column(ProcessKey::Termination).unwrap().items.is_empty());
    assert_eq!(board.total_items(), 4);
}

#[tokio::test]
async fn test_column_is_sorted_by_priority_then_overdue() {
    let mock = MockBackend::new();
    seed_payments(&mock);

    let items = service(&mock)
        .fetch_process(ProcessKey::Payment, &QueueFilter::default())
        .await
        .unwrap();
    let ids: Vec<_> = items.iter().map(|i| i.entity_id).collect();
    assert_eq!(ids, vec![4, 3, 2, 1]);
    assert_eq!(items[0].title, "Fire");
}

#[tokio::test]
async fn test_failed_view_does_not_fail_the_board() {
    let mock = MockBackend::new();
    seed_payments(&mock);
    mock.fail_table("v_commission_queue", BackendError::Unauthorized);

    let board = service(&mock)
        .fetch_board(
            &[ProcessKey::Payment, ProcessKey::Commission],
            &QueueFilter::default(),
        )
        .await;

    assert_eq!(board.column(ProcessKey::Payment).unwrap().items.len(), 4);
    let errors = board.errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].0, ProcessKey::Commission);
}

#[tokio::test]
async fn test_branch_filter_is_sent_to_every_view() {
    let mock = MockBackend::new();
    seed_payments(&mock);

    let board = service(&mock)
        .fetch_board(
            &[ProcessKey::Payment, ProcessKey::Renewal],
            &QueueFilter::for_branch(Some(2)),
        )
        .await;

    assert_eq!(board.total_items(), 1);
    for call in mock.calls() {
        let RecordedCall::Table { params, .. } = call else {
            panic!("unexpected tool call");
        };
        assert!(params.contains(&("branch_id".to_string(), "eq.2".to_string())));
    }
}

#[tokio::test]
async fn test_stats_view_and_board_fallback() {
    let mock = MockBackend::new();
    mock.set_rows(
        "v_process_dashboard_stats",
        vec![
            json!({"process": "payment", "total": 9, "overdue": 4, "urgent": 1}),
            json!({"process": "renewal", "total": 2, "overdue": 0, "urgent": 0}),
        ],
    );
    let stats = service(&mock)
        .fetch_stats(&QueueFilter::default())
        .await
        .unwrap();
    assert_eq!(stats.get(ProcessKey::Payment).overdue, 4);
    assert_eq!(stats.total().total, 11);

    let fallback = MockBackend::new();
    seed_payments(&fallback);
    let board = service(&fallback)
        .fetch_board(&[ProcessKey::Payment], &QueueFilter::default())
        .await;
    let derived = DashboardStats::from_board(&board);
    assert_eq!(derived.get(ProcessKey::Payment).total, 4);
    assert_eq!(derived.get(ProcessKey::Payment).urgent, 1);
}

#[tokio::test]
async fn test_workspace_loader_states() {
    let mock = MockBackend::new();
    seed_payments(&mock);
    let loader = WorkspaceLoader::new(service(&mock));

    let state = loader.load(ProcessKey::Payment, 3).await;
    assert_eq!(state.item().map(|i| i.entity_id), Some(3));

    let missing = loader.load(ProcessKey::Payment, 99).await;
    assert!(matches!(missing, WorkspaceState::Failed { .. }));

    mock.fail_table("v_payment_queue", BackendError::Network("timeout".into()));
    let failed = loader.load(ProcessKey::Payment, 3).await;
    assert!(matches!(failed, WorkspaceState::Failed { ref message } if message.contains("timeout")));
}
