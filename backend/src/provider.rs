use crate::types::{FetchResponse, FunctionResponse, QueryResponse, Session};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Backend returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Authentication failed ({status})")]
    Authentication { status: u16 },

    #[error("Not found: {resource}")]
    NotFound { resource: String },
}

impl BackendError {
    /// HTTP status when the backend answered with a non-2xx response.
    ///
    /// `None` for transport, configuration and decoding failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Http { status, .. } | BackendError::Authentication { status } => {
                Some(*status)
            }
            BackendError::NotFound { .. } => Some(404),
            _ => None,
        }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Operations the diagnostics checks need from the managed backend.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Reach the REST root and report round-trip latency.
    async fn ping(&self) -> BackendResult<Duration>;

    async fn query(&self, table: &str, limit: usize) -> BackendResult<QueryResponse>;

    async fn auth_settings(&self) -> BackendResult<serde_json::Value>;

    /// Resolve the session for an access token. `Ok(None)` means no active session.
    async fn get_session(&self, access_token: Option<&str>) -> BackendResult<Option<Session>>;

    async fn invoke_function(
        &self,
        name: &str,
        payload: serde_json::Value,
    ) -> BackendResult<FunctionResponse>;

    async fn fetch(&self, path: &str) -> BackendResult<FetchResponse>;

    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct MockBackend;

    #[async_trait]
    impl BackendClient for MockBackend {
        async fn ping(&self) -> BackendResult<Duration> {
            Ok(Duration::from_millis(12))
        }

        async fn query(&self, table: &str, limit: usize) -> BackendResult<QueryResponse> {
            Ok(QueryResponse {
                table: table.to_string(),
                rows: vec![json!({ "id": 1 }); limit],
                count: Some(limit as u64),
            })
        }

        async fn auth_settings(&self) -> BackendResult<serde_json::Value> {
            Ok(json!({ "external": { "email": true } }))
        }

        async fn get_session(&self, access_token: Option<&str>) -> BackendResult<Option<Session>> {
            Ok(access_token.map(|_| Session {
                user_id: "user-1".to_string(),
                email: None,
                expires_at: None,
            }))
        }

        async fn invoke_function(
            &self,
            name: &str,
            _payload: serde_json::Value,
        ) -> BackendResult<FunctionResponse> {
            Err(BackendError::NotFound {
                resource: format!("function {}", name),
            })
        }

        async fn fetch(&self, path: &str) -> BackendResult<FetchResponse> {
            Ok(FetchResponse {
                url: path.to_string(),
                status: 200,
                body: String::new(),
            })
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }

    #[tokio::test]
    async fn test_mock_backend() {
        let backend = MockBackend;

        assert_eq!(backend.ping().await.unwrap(), Duration::from_millis(12));

        let rows = backend.query("profiles", 2).await.unwrap();
        assert_eq!(rows.row_count(), 2);
        assert_eq!(rows.count, Some(2));

        assert!(backend.get_session(None).await.unwrap().is_none());
        assert!(backend.get_session(Some("token")).await.unwrap().is_some());

        let err = backend
            .invoke_function("missing", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Not found: function missing");
        assert_eq!(backend.provider_name(), "mock");
    }

    #[test]
    fn test_error_status_only_for_responses() {
        let http = BackendError::Http {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert_eq!(http.status(), Some(502));
        assert_eq!(BackendError::Authentication { status: 401 }.status(), Some(401));
        let missing = BackendError::NotFound {
            resource: "table pets".to_string(),
        };
        assert_eq!(missing.status(), Some(404));

        let timeout = BackendError::ServiceUnavailable {
            message: "Request timeout".to_string(),
        };
        assert_eq!(timeout.status(), None);
        let config = BackendError::InvalidConfig {
            message: "base_url cannot be empty".to_string(),
        };
        assert_eq!(config.status(), None);
    }
}
