//! In-memory backend for tests and offline demos

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{unwrap_envelope, Backend, BackendError, Filter, TableQuery};

/// A call received by the mock
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    Tool { tool: String, params: Value },
    Table { table: String, params: Vec<(String, String)> },
}

/// Mock implementation that records every call.
///
/// Tool responses are raw envelopes and go through the same unwrapping as
/// the HTTP backend. Tables return canned rows; `eq.` filters and `limit`
/// are honoured so single-row lookups behave like the real API.
#[derive(Default, Clone)]
pub struct MockBackend {
    tool_envelopes: Arc<Mutex<HashMap<String, Value>>>,
    tool_failures: Arc<Mutex<HashMap<String, BackendError>>>,
    tables: Arc<Mutex<HashMap<String, Vec<Value>>>>,
    table_failures: Arc<Mutex<HashMap<String, BackendError>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the envelope a tool answers with (default: `{"success": true}`)
    pub fn respond(&self, tool: &str, envelope: Value) {
        self.tool_envelopes
            .lock()
            .unwrap()
            .insert(tool.to_string(), envelope);
    }

    /// Make a tool fail at the transport level
    pub fn fail_tool(&self, tool: &str, error: BackendError) {
        self.tool_failures
            .lock()
            .unwrap()
            .insert(tool.to_string(), error);
    }

    /// Set the rows a table or view returns
    pub fn set_rows(&self, table: &str, rows: Vec<Value>) {
        self.tables.lock().unwrap().insert(table.to_string(), rows);
    }

    /// Make a table read fail
    pub fn fail_table(&self, table: &str, error: BackendError) {
        self.table_failures
            .lock()
            .unwrap()
            .insert(table.to_string(), error);
    }

    /// All calls received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Tool calls only, as `(tool, params)`
    pub fn tool_calls(&self) -> Vec<(String, Value)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                RecordedCall::Tool { tool, params } => Some((tool, params)),
                RecordedCall::Table { .. } => None,
            })
            .collect()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn matches_eq(row: &Value, column: &str, expected: &str) -> bool {
    match row.get(column) {
        Some(Value::String(s)) => s == expected,
        Some(Value::Null) | None => false,
        Some(other) => other.to_string() == expected,
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn call_tool(&self, tool: &str, params: Value) -> Result<Value, BackendError> {
        self.record(RecordedCall::Tool {
            tool: tool.to_string(),
            params,
        });

        if let Some(err) = self.tool_failures.lock().unwrap().get(tool) {
            return Err(err.clone());
        }

        let envelope = self
            .tool_envelopes
            .lock()
            .unwrap()
            .get(tool)
            .cloned()
            .unwrap_or_else(|| json!({"success": true}));

        unwrap_envelope(tool, envelope)
    }

    async fn query_table(
        &self,
        table: &str,
        query: &TableQuery,
    ) -> Result<Vec<Value>, BackendError> {
        self.record(RecordedCall::Table {
            table: table.to_string(),
            params: query.to_params(),
        });

        if let Some(err) = self.table_failures.lock().unwrap().get(table) {
            return Err(err.clone());
        }

        let rows = self
            .tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default();

        let mut rows: Vec<Value> = rows
            .into_iter()
            .filter(|row| {
                query.to_params().iter().all(|(column, _)| {
                    match query.filter_for(column) {
                        Some(Filter::Eq(v)) => matches_eq(row, column, v),
                        _ => true,
                    }
                })
            })
            .collect();

        if let Some(limit) = query
            .to_params()
            .iter()
            .find(|(k, _)| k == "limit")
            .and_then(|(_, v)| v.parse::<usize>().ok())
        {
            rows.truncate(limit);
        }

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_tool_envelope_succeeds() {
        let mock = MockBackend::new();
        let data = mock.call_tool("renewal_activate", json!({"contract_id": 1})).await;
        assert_eq!(data.unwrap(), json!({"success": true}));
        assert_eq!(mock.tool_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_envelope_is_unwrapped() {
        let mock = MockBackend::new();
        mock.respond("invoice_void", json!({"success": false, "error": "already void"}));
        let err = mock.call_tool("invoice_void", json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "already void");
    }

    #[tokio::test]
    async fn test_eq_filter_and_limit() {
        let mock = MockBackend::new();
        mock.set_rows(
            "v_payment_queue",
            vec![
                json!({"payment_id": 1}),
                json!({"payment_id": 2}),
                json!({"payment_id": 2, "dup": true}),
            ],
        );

        let rows = mock
            .query_table(
                "v_payment_queue",
                &TableQuery::new().eq("payment_id", 2).limit(1),
            )
            .await
            .unwrap();
        assert_eq!(rows, vec![json!({"payment_id": 2})]);
    }

    #[tokio::test]
    async fn test_table_failure() {
        let mock = MockBackend::new();
        mock.fail_table("v_invoice_queue", BackendError::Forbidden);
        let result = mock
            .query_table("v_invoice_queue", &TableQuery::new())
            .await;
        assert_eq!(result, Err(BackendError::Forbidden));
        assert!(matches!(mock.calls()[0], RecordedCall::Table { .. }));
    }
}
