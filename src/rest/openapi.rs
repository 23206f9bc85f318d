//! OpenAPI specification builder using utoipa.

use axum::Json;
use utoipa::OpenApi;

use crate::rest::dto::{
    ActionInfo, ActionRequest, ActionResponse, DecisionResponse, FieldInfo, HealthResponse,
    KanbanBoardResponse, KanbanColumnResponse, NavigateResponse, PrimaryActionResponse,
    ProcessInfo, ProcessStatsResponse, QueueItemResponse, TimelineStepResponse, WorkspaceResponse,
};
use crate::rest::error::ErrorResponse;

/// OpenAPI documentation for the back-office REST API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Backoffice API",
        description = "Workflow queues, decision records and action dispatch for the coworking CRM.",
        license(name = "MIT")
    ),
    paths(
        crate::rest::routes::health::health,
        crate::rest::routes::processes::list,
        crate::rest::routes::processes::workspace,
        crate::rest::routes::queue::kanban,
        crate::rest::routes::queue::stats,
        crate::rest::routes::actions::execute,
    ),
    components(
        schemas(
            HealthResponse,
            ProcessInfo,
            ActionInfo,
            FieldInfo,
            QueueItemResponse,
            WorkspaceResponse,
            DecisionResponse,
            PrimaryActionResponse,
            TimelineStepResponse,
            KanbanBoardResponse,
            KanbanColumnResponse,
            ProcessStatsResponse,
            ActionRequest,
            ActionResponse,
            NavigateResponse,
            ErrorResponse,
        )
    ),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Processes", description = "Workflow catalogue and workspaces"),
        (name = "Queue", description = "Kanban board and header counts"),
        (name = "Actions", description = "Workflow action dispatch"),
    )
)]
pub struct ApiDoc;

impl ApiDoc {
    /// Generate the OpenAPI specification as a JSON string
    pub fn json() -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::openapi())
    }
}

/// Serves the generated document
pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::json().expect("Failed to generate OpenAPI spec");
        assert!(spec.contains("Backoffice API"));
        assert!(spec.contains("/api/v1/health"));
        assert!(spec.contains("/api/v1/processes/{process}/actions/{action}"));
        assert!(spec.contains("/api/v1/queue/kanban"));
    }

    #[test]
    fn test_openapi_has_all_tags() {
        let spec = ApiDoc::json().expect("Failed to generate OpenAPI spec");
        for tag in ["\"Health\"", "\"Processes\"", "\"Queue\"", "\"Actions\""] {
            assert!(spec.contains(tag), "missing tag {}", tag);
        }
    }
}
