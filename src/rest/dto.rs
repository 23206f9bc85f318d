//! Data Transfer Objects for the REST API.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};

use crate::process::payload::payload_fields;
use crate::process::queue::{ProcessStats, QueueFilter};
use crate::process::timeline::progress;
use crate::process::{
    ActionResult, DecisionRecord, KanbanBoard, KanbanColumn, ProcessAction, ProcessKey, QueueItem,
    TimelineStep,
};

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backend: String,
}

// =============================================================================
// Availability map
// =============================================================================

/// A payload field an action accepts
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FieldInfo {
    pub name: String,
    pub required: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionInfo {
    pub code: String,
    pub label: String,
    pub fields: Vec<FieldInfo>,
}

impl From<ProcessAction> for ActionInfo {
    fn from(action: ProcessAction) -> Self {
        Self {
            code: action.code().to_string(),
            label: action.label().to_string(),
            fields: payload_fields(action)
                .iter()
                .map(|(name, required)| FieldInfo {
                    name: name.to_string(),
                    required: *required,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessInfo {
    pub key: String,
    pub name: String,
    pub queue_view: String,
    pub actions: Vec<ActionInfo>,
}

impl From<ProcessKey> for ProcessInfo {
    fn from(process: ProcessKey) -> Self {
        Self {
            key: process.as_str().to_string(),
            name: process.display_name().to_string(),
            queue_view: process.queue_view(),
            actions: ProcessAction::for_process(process)
                .into_iter()
                .map(ActionInfo::from)
                .collect(),
        }
    }
}

// =============================================================================
// Queue items
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PrimaryActionResponse {
    pub code: String,
    pub label: String,
    /// False when the code is not in the action table
    pub defined: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DecisionResponse {
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked_by: Option<String>,
    pub blocked_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    pub priority: String,
    pub is_overdue: bool,
    pub overdue_days: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overdue_warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_action: Option<PrimaryActionResponse>,
}

impl DecisionResponse {
    pub fn new(process: ProcessKey, d: &DecisionRecord) -> Self {
        Self {
            completed: d.is_completed(),
            blocked_by: d.blocked_by.clone(),
            blocked_label: d.blocked_label(process).into_owned(),
            next_action: d.next_action.clone(),
            owner: d.owner.as_ref().map(|o| o.as_str().to_string()),
            priority: d.priority.as_str().to_string(),
            is_overdue: d.is_overdue,
            overdue_days: d.overdue_days,
            overdue_warning: d.overdue_warning(),
            primary_action: d.primary_action(process).map(|p| PrimaryActionResponse {
                defined: p.action.is_some(),
                code: p.code,
                label: p.label.into_owned(),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TimelineStepResponse {
    pub key: String,
    pub label: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&TimelineStep> for TimelineStepResponse {
    fn from(step: &TimelineStep) -> Self {
        Self {
            key: step.key.clone(),
            label: step.display_label().to_string(),
            status: step.status.as_str().to_string(),
            details: step.details.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct QueueItemResponse {
    pub process: String,
    pub entity_id: i64,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub decision: DecisionResponse,
    pub timeline: Vec<TimelineStepResponse>,
    pub steps_done: usize,
    pub steps_total: usize,
}

impl From<&QueueItem> for QueueItemResponse {
    fn from(item: &QueueItem) -> Self {
        let (steps_done, steps_total) = progress(&item.timeline);
        Self {
            process: item.process.as_str().to_string(),
            entity_id: item.entity_id,
            title: item.title.clone(),
            branch_id: item.branch_id,
            due_date: item.due_date.map(|d| d.to_string()),
            decision: DecisionResponse::new(item.process, &item.decision),
            timeline: item.timeline.iter().map(TimelineStepResponse::from).collect(),
            steps_done,
            steps_total,
        }
    }
}

/// A queue item with every column of its row
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WorkspaceResponse {
    #[serde(flatten)]
    pub item: QueueItemResponse,
    #[schema(value_type = Object)]
    pub row: Value,
}

impl From<&QueueItem> for WorkspaceResponse {
    fn from(item: &QueueItem) -> Self {
        Self {
            item: QueueItemResponse::from(item),
            row: Value::Object(item.row.clone()),
        }
    }
}

// =============================================================================
// Kanban
// =============================================================================

#[derive(Debug, Deserialize, IntoParams)]
pub struct KanbanQuery {
    pub branch_id: Option<i64>,
    /// Keep finished workflows (default false)
    pub include_completed: Option<bool>,
    /// Comma-separated process keys (default: configured board)
    pub processes: Option<String>,
}

impl KanbanQuery {
    pub fn filter(&self) -> QueueFilter {
        QueueFilter {
            branch_id: self.branch_id,
            include_completed: self.include_completed.unwrap_or(false),
            ..QueueFilter::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct KanbanColumnResponse {
    pub process: String,
    pub title: String,
    pub overdue_count: usize,
    pub urgent_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub items: Vec<QueueItemResponse>,
}

impl From<&KanbanColumn> for KanbanColumnResponse {
    fn from(column: &KanbanColumn) -> Self {
        Self {
            process: column.process.as_str().to_string(),
            title: column.title(),
            overdue_count: column.overdue_count(),
            urgent_count: column.urgent_count(),
            error: column.error.clone(),
            items: column.items.iter().map(QueueItemResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct KanbanBoardResponse {
    pub columns: Vec<KanbanColumnResponse>,
    pub total_count: usize,
    pub last_updated: String,
}

impl From<&KanbanBoard> for KanbanBoardResponse {
    fn from(board: &KanbanBoard) -> Self {
        Self {
            columns: board.columns.iter().map(KanbanColumnResponse::from).collect(),
            total_count: board.total_items(),
            last_updated: board.fetched_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProcessStatsResponse {
    pub total: i64,
    pub overdue: i64,
    pub urgent: i64,
}

impl From<ProcessStats> for ProcessStatsResponse {
    fn from(s: ProcessStats) -> Self {
        Self {
            total: s.total,
            overdue: s.overdue,
            urgent: s.urgent,
        }
    }
}

// =============================================================================
// Actions
// =============================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionRequest {
    pub entity_id: i64,
    /// Action-specific fields; omitted means `{}`
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: Value,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NavigateResponse {
    pub url: String,
    pub reason: String,
    /// `url` expanded with the configured web origin
    pub link: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigate: Option<NavigateResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResponse {
    pub fn new(result: ActionResult, link: impl Fn(&str) -> String) -> Self {
        Self {
            success: result.success,
            data: result.data,
            navigate: result.navigate.map(|n| NavigateResponse {
                link: link(&n.url),
                url: n.url,
                reason: n.reason,
            }),
            error: result.error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{NavigationIntent, PaymentAction};
    use serde_json::json;

    #[test]
    fn test_action_info_lists_fields() {
        let info = ActionInfo::from(ProcessAction::Payment(PaymentAction::RecordPayment));
        assert_eq!(info.code, "RECORD_PAYMENT");
        assert_eq!(info.fields.len(), 2);
        assert!(info.fields[0].required);
    }

    #[test]
    fn test_process_info() {
        let info = ProcessInfo::from(ProcessKey::Signing);
        assert_eq!(info.queue_view, "v_signing_queue");
        assert_eq!(info.actions.len(), 3);
    }

    #[test]
    fn test_workspace_response_flattens_item() {
        let item = QueueItem::from_row(
            ProcessKey::Payment,
            json!({"payment_id": 7, "blocked_by": "overdue", "priority": 1, "due_date": "2026-03-01T00:00:00Z"}),
        )
        .unwrap();
        let json = serde_json::to_value(WorkspaceResponse::from(&item)).unwrap();
        assert_eq!(json["entity_id"], json!(7));
        assert_eq!(json["due_date"], json!("2026-03-01"));
        assert_eq!(json["decision"]["priority"], json!("urgent"));
        assert_eq!(json["decision"]["primary_action"]["code"], json!("SEND_REMINDER"));
        assert_eq!(json["row"]["payment_id"], json!(7));
    }

    #[test]
    fn test_action_response_expands_link() {
        let result = ActionResult {
            success: true,
            data: None,
            navigate: Some(NavigationIntent {
                url: "/contracts/4".into(),
                reason: "review".into(),
            }),
            error: None,
        };
        let response = ActionResponse::new(result, |u| format!("https://crm{}", u));
        let nav = response.navigate.unwrap();
        assert_eq!(nav.link, "https://crm/contracts/4");
        assert_eq!(nav.url, "/contracts/4");
    }

    #[test]
    fn test_kanban_query_filter() {
        let q = KanbanQuery {
            branch_id: Some(3),
            include_completed: None,
            processes: None,
        };
        let filter = q.filter();
        assert_eq!(filter.branch_id, Some(3));
        assert!(!filter.include_completed);
    }
}
