//! Action dispatcher: typed action + entity + payload -> backend tool call.
//!
//! No retries, no idempotency tokens. A failed call is terminal and the
//! caller decides how to surface it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::action::ProcessAction;
pub use super::payload::NavigationIntent;
use super::payload::{PayloadError, Step};
use crate::backend::{Backend, BackendError};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// The pair is not in any action table; the backend was not contacted
    #[error("未定義的行動: {process}.{action}")]
    UndefinedAction { process: String, action: String },

    /// Payload failed validation; the backend was not contacted
    #[error("參數錯誤 ({action}): {reason}")]
    InvalidPayload { action: String, reason: String },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl DispatchError {
    pub fn undefined(process: impl Into<String>, action: impl Into<String>) -> Self {
        DispatchError::UndefinedAction {
            process: process.into(),
            action: action.into(),
        }
    }

    fn invalid(action: ProcessAction, err: PayloadError) -> Self {
        DispatchError::InvalidPayload {
            action: action.to_string(),
            reason: err.to_string(),
        }
    }

    /// True when the failure happened before any network access
    pub fn is_local(&self) -> bool {
        !matches!(self, DispatchError::Backend(_))
    }
}

/// Successful result of an action
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The tool ran; `data` is its unwrapped response
    Rpc { tool: String, data: Value },
    /// The caller should change pages
    Navigate(NavigationIntent),
}

/// JSON envelope for string-keyed callers: `{success, data | navigate | error}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigate: Option<NavigationIntent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResult {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            navigate: None,
            error: Some(message.into()),
        }
    }
}

impl From<Result<ActionOutcome, DispatchError>> for ActionResult {
    fn from(result: Result<ActionOutcome, DispatchError>) -> Self {
        match result {
            Ok(ActionOutcome::Rpc { data, .. }) => Self {
                success: true,
                data: Some(data),
                navigate: None,
                error: None,
            },
            Ok(ActionOutcome::Navigate(intent)) => Self {
                success: true,
                data: None,
                navigate: Some(intent),
                error: None,
            },
            Err(err) => Self::failure(err.to_string()),
        }
    }
}

/// Routes actions to the backend
#[derive(Clone)]
pub struct ActionDispatcher {
    backend: Arc<dyn Backend>,
}

impl ActionDispatcher {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Look up a string pair, failing with the undefined-action error
    pub fn resolve(process: &str, action: &str) -> Result<ProcessAction, DispatchError> {
        ProcessAction::parse(process, action).ok_or_else(|| DispatchError::undefined(process, action))
    }

    /// Execute a typed action against one entity
    pub async fn execute(
        &self,
        action: ProcessAction,
        entity_id: i64,
        payload: &Value,
    ) -> Result<ActionOutcome, DispatchError> {
        let step = action
            .plan(entity_id, payload)
            .map_err(|e| DispatchError::invalid(action, e))?;

        match step {
            Step::Navigate(intent) => {
                info!(%action, entity_id, url = %intent.url, "Action resolved to navigation");
                Ok(ActionOutcome::Navigate(intent))
            }
            Step::Tool(call) => {
                info!(
                    %action,
                    entity_id,
                    tool = call.tool,
                    backend = self.backend.name(),
                    "Dispatching action"
                );
                match self.backend.call_tool(call.tool, call.params).await {
                    Ok(data) => Ok(ActionOutcome::Rpc {
                        tool: call.tool.to_string(),
                        data,
                    }),
                    Err(e) => {
                        warn!(%action, entity_id, tool = call.tool, error = %e, "Action failed");
                        Err(e.into())
                    }
                }
            }
        }
    }

    /// String-keyed entry point; never fails past the caller
    pub async fn execute_keys(
        &self,
        process: &str,
        action: &str,
        entity_id: i64,
        payload: &Value,
    ) -> ActionResult {
        let result = match Self::resolve(process, action) {
            Ok(action) => self.execute(action, entity_id, payload).await,
            Err(e) => {
                warn!(process, action, "Undefined action requested");
                Err(e)
            }
        };
        result.into()
    }
}
