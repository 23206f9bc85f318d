//! Workspace: a single workflow instance with its decision and timeline.

use serde::Serialize;
use tracing::{info, warn};

use super::queue::{QueueItem, QueueService};
use super::ProcessKey;

/// What the workspace view shows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WorkspaceState {
    Loading,
    /// Load failed; the view offers a retry
    Failed { message: String },
    Ready(Box<QueueItem>),
}

impl WorkspaceState {
    pub fn is_loading(&self) -> bool {
        matches!(self, WorkspaceState::Loading)
    }

    pub fn item(&self) -> Option<&QueueItem> {
        match self {
            WorkspaceState::Ready(item) => Some(item),
            _ => None,
        }
    }
}

/// Loads one workspace by process and entity id
#[derive(Clone)]
pub struct WorkspaceLoader {
    queue: QueueService,
}

impl WorkspaceLoader {
    pub fn new(queue: QueueService) -> Self {
        Self { queue }
    }

    /// Fetch the row; a missing row is a failure, not an empty workspace
    pub async fn load(&self, process: ProcessKey, entity_id: i64) -> WorkspaceState {
        match self.queue.fetch_one(process, entity_id).await {
            Ok(Some(item)) => {
                info!(%process, entity_id, "Workspace loaded");
                WorkspaceState::Ready(Box::new(item))
            }
            Ok(None) => WorkspaceState::Failed {
                message: format!("找不到{} #{}", process.display_name(), entity_id),
            },
            Err(e) => {
                warn!(%process, entity_id, error = %e, "Workspace load failed");
                WorkspaceState::Failed {
                    message: e.user_message(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackendError, MockBackend};
    use crate::config::KanbanConfig;
    use serde_json::json;
    use std::sync::Arc;

    fn loader(mock: &MockBackend) -> WorkspaceLoader {
        WorkspaceLoader::new(QueueService::new(
            Arc::new(mock.clone()),
            &KanbanConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_ready() {
        let mock = MockBackend::new();
        mock.set_rows(
            "v_renewal_queue",
            vec![json!({
                "contract_id": 31,
                "customer_name": "王小明",
                "decision_blocked_by": "need_notice",
                "timeline": [{"key": "draft", "status": "done"}]
            })],
        );
        let state = loader(&mock).load(ProcessKey::Renewal, 31).await;
        let item = state.item().unwrap();
        assert_eq!(item.title, "王小明");
        assert_eq!(item.timeline.len(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_failure() {
        let mock = MockBackend::new();
        let state = loader(&mock).load(ProcessKey::Commission, 4).await;
        assert_eq!(
            state,
            WorkspaceState::Failed {
                message: "找不到佣金 #4".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_backend_error_is_failure() {
        let mock = MockBackend::new();
        mock.fail_table("v_payment_queue", BackendError::Unauthorized);
        let state = loader(&mock).load(ProcessKey::Payment, 1).await;
        assert!(matches!(state, WorkspaceState::Failed { .. }));
        assert!(!state.is_loading());
    }

    #[test]
    fn test_serialized_state_tag() {
        let json = serde_json::to_value(WorkspaceState::Failed {
            message: "x".into(),
        })
        .unwrap();
        assert_eq!(json, json!({"state": "failed", "message": "x"}));
    }
}
