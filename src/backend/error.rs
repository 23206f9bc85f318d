//! Backend error types

use thiserror::Error;

/// Errors that can occur when talking to the back-office backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    /// 401 Unauthorized - token invalid or expired
    #[error("backend: Unauthorized (401) - check the API token")]
    Unauthorized,

    /// 403 Forbidden - token lacks required permissions
    #[error("backend: Forbidden (403) - insufficient permissions")]
    Forbidden,

    /// Network or timeout error
    #[error("backend: Network error - {0}")]
    Network(String),

    /// Other HTTP errors
    #[error("backend: HTTP {status} - {message}")]
    Http { status: u16, message: String },

    /// The tool ran but reported `success: false` in its envelope
    #[error("{message}")]
    Tool { tool: String, message: String },

    /// Response body could not be decoded
    #[error("backend: unexpected response - {0}")]
    Decode(String),

    /// Backend base URL or token missing
    #[error("backend: Not configured ({0})")]
    NotConfigured(String),
}

impl BackendError {
    /// Check if this is an authentication error (401 or 403)
    pub fn is_auth_error(&self) -> bool {
        matches!(self, BackendError::Unauthorized | BackendError::Forbidden)
    }

    /// Create an HTTP error from a status code and body
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            401 => BackendError::Unauthorized,
            403 => BackendError::Forbidden,
            _ => BackendError::Http {
                status,
                message: body.into(),
            },
        }
    }

    /// Create a tool failure
    pub fn tool(tool: impl Into<String>, message: impl Into<String>) -> Self {
        BackendError::Tool {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Message suitable for a toast; tool failures show the backend's own text
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_auth_error() {
        assert!(BackendError::Unauthorized.is_auth_error());
        assert!(BackendError::Forbidden.is_auth_error());
        assert!(!BackendError::Network("timeout".into()).is_auth_error());
    }

    #[test]
    fn test_from_status() {
        assert_eq!(BackendError::from_status(401, ""), BackendError::Unauthorized);
        assert_eq!(BackendError::from_status(403, ""), BackendError::Forbidden);
        assert_eq!(
            BackendError::from_status(500, "boom"),
            BackendError::Http {
                status: 500,
                message: "boom".into()
            }
        );
    }

    #[test]
    fn test_tool_error_displays_backend_message() {
        let err = BackendError::tool("crm_record_payment", "付款記錄不存在");
        assert_eq!(err.to_string(), "付款記錄不存在");
    }

    #[test]
    fn test_display() {
        let err = BackendError::NotConfigured("base_url".into());
        assert_eq!(err.to_string(), "backend: Not configured (base_url)");
    }
}
