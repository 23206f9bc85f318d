//! Backend abstraction over the back-office data services.
//!
//! Two surfaces are consumed, never defined, here:
//! - a PostgREST-like table API for queue views and dashboard stats
//! - a generic "call tool" RPC endpoint returning a `{success, ...}` envelope

mod error;
mod http;
mod mock;
pub mod query;

pub use error::BackendError;
pub use http::HttpBackend;
pub use mock::{MockBackend, RecordedCall};
pub use query::{Direction, Filter, TableQuery};

use async_trait::async_trait;
use serde_json::Value;

const DEFAULT_TOOL_FAILURE: &str = "工具執行失敗";

/// Trait for backends that serve queue views and execute tools
#[async_trait]
pub trait Backend: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Invoke a named tool and return its unwrapped success envelope
    async fn call_tool(&self, tool: &str, params: Value) -> Result<Value, BackendError>;

    /// Read rows from a table or view
    async fn query_table(
        &self,
        table: &str,
        query: &TableQuery,
    ) -> Result<Vec<Value>, BackendError>;
}

/// Unwrap a tool's `{success, ...}` envelope.
///
/// `success: true` yields the whole envelope as data. `success: false`
/// becomes [`BackendError::Tool`] carrying the backend's `error` or
/// `message` text.
pub fn unwrap_envelope(tool: &str, body: Value) -> Result<Value, BackendError> {
    let Some(success) = body.get("success").and_then(Value::as_bool) else {
        return Err(BackendError::Decode(format!(
            "tool '{}' returned no success flag",
            tool
        )));
    };

    if success {
        return Ok(body);
    }

    let message = match body.get("error") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(obj)) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
    .or_else(|| {
        body.get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
    })
    .unwrap_or_else(|| DEFAULT_TOOL_FAILURE.to_string());

    Err(BackendError::tool(tool, message))
}
