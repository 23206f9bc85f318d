//! HTTP backend: PostgREST-style table reads and the tool RPC endpoint

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::Value;
use std::env;
use std::time::Duration;
use tracing::{debug, warn};

use super::{unwrap_envelope, Backend, BackendError, TableQuery};
use crate::config::BackendConfig;

const BACKEND_NAME: &str = "http";

/// Backend reached over HTTP
pub struct HttpBackend {
    base_url: String,
    table_path: String,
    tool_path: String,
    token: Option<String>,
    client: Client,
}

impl HttpBackend {
    /// Create a backend from explicit settings
    pub fn new(config: &BackendConfig, token: Option<String>) -> Result<Self, BackendError> {
        if config.base_url.trim().is_empty() {
            return Err(BackendError::NotConfigured("backend.base_url".to_string()));
        }

        let mut builder = Client::builder();
        if config.timeout_secs > 0 {
            builder = builder.timeout(Duration::from_secs(config.timeout_secs));
        }
        let client = builder
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            table_path: normalize_path(&config.table_path),
            tool_path: normalize_path(&config.tool_path),
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    /// Create from config, reading the token from the configured env var
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        let token = env::var(&config.api_key_env).ok();
        if token.is_none() {
            warn!(
                env = %config.api_key_env,
                "No backend token in environment, requests are anonymous"
            );
        }
        Self::new(config, token)
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}{}/{}", self.base_url, self.table_path, table)
    }

    pub fn tool_url(&self) -> String {
        format!("{}{}", self.base_url, self.tool_path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, BackendError> {
        let response = self.authorize(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), body));
        }
        Ok(response)
    }
}

fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() || trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[derive(Serialize)]
struct ToolRequest<'a> {
    tool: &'a str,
    parameters: Value,
}

#[async_trait]
impl Backend for HttpBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn call_tool(&self, tool: &str, params: Value) -> Result<Value, BackendError> {
        debug!(tool, "Calling backend tool");

        let request = self.client.post(self.tool_url()).json(&ToolRequest {
            tool,
            parameters: params,
        });
        let body: Value = self.send(request).await?.json().await?;

        unwrap_envelope(tool, body)
    }

    async fn query_table(
        &self,
        table: &str,
        query: &TableQuery,
    ) -> Result<Vec<Value>, BackendError> {
        let params = query.to_params();
        debug!(table, ?params, "Querying backend table");

        let request = self.client.get(self.table_url(table)).query(&params);
        let body: Value = self.send(request).await?.json().await?;

        match body {
            Value::Array(rows) => Ok(rows),
            other => Err(BackendError::Decode(format!(
                "expected rows from '{}', got {}",
                table,
                type_name(&other)
            ))),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_urls() {
        let mut config = Config::default().backend;
        config.base_url = "https://crm.example.com/".to_string();
        config.table_path = "rest/v1/".to_string();

        let backend = HttpBackend::new(&config, None).unwrap();
        assert_eq!(
            backend.table_url("v_payment_queue"),
            "https://crm.example.com/rest/v1/v_payment_queue"
        );
        assert_eq!(backend.tool_url(), "https://crm.example.com/api/tools/call");
    }

    #[test]
    fn test_empty_base_url_not_configured() {
        let mut config = Config::default().backend;
        config.base_url = "  ".to_string();
        assert!(matches!(
            HttpBackend::new(&config, None),
            Err(BackendError::NotConfigured(_))
        ));
    }

    #[test]
    fn test_empty_token_is_dropped() {
        let config = Config::default().backend;
        let backend = HttpBackend::new(&config, Some(String::new())).unwrap();
        assert!(backend.token.is_none());
    }

    #[test]
    fn test_type_name() {
        assert_eq!(type_name(&serde_json::json!({})), "object");
        assert_eq!(type_name(&Value::Null), "null");
    }
}
