use crate::config::BackendConfig;
use crate::provider::{BackendClient, BackendError, BackendResult};
use crate::types::{FetchResponse, FunctionResponse, QueryResponse, Session};
use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Deserialize)]
struct AuthUserResponse {
    id: String,
    email: Option<String>,
}

/// REST client for the hosted backend (PostgREST tables, GoTrue auth, edge functions).
pub struct HttpBackend {
    http_client: reqwest::Client,
    base_url: String,
    config: BackendConfig,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        config
            .validate()
            .map_err(|msg| BackendError::InvalidConfig { message: msg })?;

        let base_url = if config.base_url.ends_with('/') {
            config.base_url.clone()
        } else {
            format!("{}/", config.base_url)
        };

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::InvalidConfig {
                message: format!("Failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            base_url,
            config,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if self.config.anon_key.is_empty() {
            return request;
        }
        request
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
    }

    async fn send(&self, request: RequestBuilder) -> BackendResult<Response> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::ServiceUnavailable {
                    message: "Request timeout".to_string(),
                }
            } else if e.is_connect() {
                BackendError::ServiceUnavailable {
                    message: "Cannot connect to backend service".to_string(),
                }
            } else {
                BackendError::Network(e)
            }
        })
    }

    async fn ensure_success(response: Response, resource: &str) -> BackendResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(BackendError::Authentication {
                status: status.as_u16(),
            }),
            StatusCode::NOT_FOUND => Err(BackendError::NotFound {
                resource: resource.to_string(),
            }),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(BackendError::Http {
                    status: status.as_u16(),
                    body,
                })
            }
        }
    }

    /// Total row count from a `Content-Range` header such as `0-4/57`.
    fn parse_content_range_total(value: &str) -> Option<u64> {
        value.rsplit_once('/').and_then(|(_, total)| total.parse().ok())
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    async fn ping(&self) -> BackendResult<Duration> {
        debug!("Pinging backend at {}", self.base_url);

        let started = Instant::now();
        let request = self.authorize(self.http_client.get(self.url("rest/v1/")));
        let response = self.send(request).await?;
        Self::ensure_success(response, "rest/v1/").await?;
        let latency = started.elapsed();

        debug!("Backend ping completed in {:?}", latency);
        Ok(latency)
    }

    async fn query(&self, table: &str, limit: usize) -> BackendResult<QueryResponse> {
        debug!("Querying table {} (limit {})", table, limit);

        let request = self
            .authorize(self.http_client.get(self.url(&format!("rest/v1/{}", table))))
            .query(&[("select", "*".to_string()), ("limit", limit.to_string())])
            .header("Prefer", "count=exact");
        let response = self.send(request).await?;
        let response = Self::ensure_success(response, &format!("table {}", table)).await?;

        let count = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(Self::parse_content_range_total);

        let body = response.text().await?;
        let rows: Vec<serde_json::Value> = serde_json::from_str(&body)?;

        info!("Query on {} returned {} rows", table, rows.len());
        Ok(QueryResponse {
            table: table.to_string(),
            rows,
            count,
        })
    }

    async fn auth_settings(&self) -> BackendResult<serde_json::Value> {
        debug!("Fetching auth settings");

        let request = self.authorize(self.http_client.get(self.url("auth/v1/settings")));
        let response = self.send(request).await?;
        let response = Self::ensure_success(response, "auth settings").await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn get_session(&self, access_token: Option<&str>) -> BackendResult<Option<Session>> {
        let Some(token) = access_token else {
            debug!("No access token supplied, skipping session lookup");
            return Ok(None);
        };

        let mut request = self.http_client.get(self.url("auth/v1/user"));
        if !self.config.anon_key.is_empty() {
            request = request.header("apikey", &self.config.anon_key);
        }
        let response = self.send(request.bearer_auth(token)).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            warn!("Access token rejected, treating as no active session");
            return Ok(None);
        }

        let response = Self::ensure_success(response, "auth user").await?;
        let body = response.text().await?;
        let user: AuthUserResponse = serde_json::from_str(&body)?;

        Ok(Some(Session {
            user_id: user.id,
            email: user.email,
            expires_at: None,
        }))
    }

    async fn invoke_function(
        &self,
        name: &str,
        payload: serde_json::Value,
    ) -> BackendResult<FunctionResponse> {
        debug!("Invoking function {}", name);

        let request = self
            .authorize(self.http_client.post(self.url(&format!("functions/v1/{}", name))))
            .json(&payload);
        let response = self.send(request).await?;

        let status = response.status();
        let text = response.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));

        if !status.is_success() {
            warn!("Function {} returned {}", name, status);
        }

        Ok(FunctionResponse {
            function: name.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch(&self, path: &str) -> BackendResult<FetchResponse> {
        let url = self.url(path);
        debug!("Fetching {}", url);

        let request = self.authorize(self.http_client.get(&url));
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(FetchResponse { url, status, body })
    }

    fn provider_name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn backend_for(server: &mockito::ServerGuard) -> HttpBackend {
        let config = BackendConfig::default()
            .with_base_url(server.url())
            .with_anon_key("anon");
        HttpBackend::new(config).unwrap()
    }

    #[test]
    fn test_backend_creation_url_normalization() {
        let backend =
            HttpBackend::new(BackendConfig::default().with_base_url("http://localhost:54321"))
                .unwrap();
        assert_eq!(backend.base_url(), "http://localhost:54321/");
        assert_eq!(backend.url("/rest/v1/"), "http://localhost:54321/rest/v1/");

        let backend =
            HttpBackend::new(BackendConfig::default().with_base_url("http://localhost:54321/"))
                .unwrap();
        assert_eq!(backend.base_url(), "http://localhost:54321/");
    }

    #[test]
    fn test_backend_rejects_invalid_config() {
        let result = HttpBackend::new(BackendConfig::default().with_base_url("localhost"));
        assert!(matches!(result, Err(BackendError::InvalidConfig { .. })));
    }

    #[test]
    fn test_parse_content_range_total() {
        assert_eq!(HttpBackend::parse_content_range_total("0-4/57"), Some(57));
        assert_eq!(HttpBackend::parse_content_range_total("*/0"), Some(0));
        assert_eq!(HttpBackend::parse_content_range_total("0-4/*"), None);
        assert_eq!(HttpBackend::parse_content_range_total("garbage"), None);
    }

    #[tokio::test]
    async fn test_ping_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/")
            .match_header("apikey", "anon")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let backend = backend_for(&server);
        assert!(backend.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_ping_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/")
            .with_status(401)
            .create_async()
            .await;

        let backend = backend_for(&server);
        assert!(matches!(
            backend.ping().await,
            Err(BackendError::Authentication { status: 401 })
        ));
    }

    #[tokio::test]
    async fn test_query_reads_rows_and_count() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/profiles")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-range", "0-1/42")
            .with_body(r#"[{"id": "a"}, {"id": "b"}]"#)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let response = backend.query("profiles", 2).await.unwrap();
        assert_eq!(response.table, "profiles");
        assert_eq!(response.row_count(), 2);
        assert_eq!(response.count, Some(42));
    }

    #[tokio::test]
    async fn test_query_returns_error_on_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/profiles")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not valid json")
            .create_async()
            .await;

        let backend = backend_for(&server);
        let result = backend.query("profiles", 1).await;
        assert!(matches!(result, Err(BackendError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_query_returns_http_error_on_server_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/community_posts")
            .match_query(Matcher::Any)
            .with_status(500)
            .with_body("relation does not exist")
            .create_async()
            .await;

        let backend = backend_for(&server);
        let result = backend.query("community_posts", 5).await;
        match result {
            Err(BackendError::Http { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "relation does not exist");
            }
            other => panic!("unexpected result: {:?}", other.map(|r| r.rows)),
        }
    }

    #[tokio::test]
    async fn test_get_session_without_token_skips_request() {
        let server = mockito::Server::new_async().await;
        let backend = backend_for(&server);
        assert_eq!(backend.get_session(None).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_session_with_token() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/auth/v1/user")
            .match_header("authorization", "Bearer user-token")
            .with_status(200)
            .with_body(r#"{"id": "user-7", "email": "owner@example.com"}"#)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let session = backend.get_session(Some("user-token")).await.unwrap();
        assert_eq!(
            session,
            Some(Session {
                user_id: "user-7".to_string(),
                email: Some("owner@example.com".to_string()),
                expires_at: None,
            })
        );
    }

    #[tokio::test]
    async fn test_invoke_function_keeps_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/functions/v1/send-email")
            .match_body(Matcher::Json(json!({ "test": true })))
            .with_status(500)
            .with_body(r#"{"error": "SMTP relay refused"}"#)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let response = backend
            .invoke_function("send-email", json!({ "test": true }))
            .await
            .unwrap();
        assert_eq!(response.status, 500);
        assert!(!response.is_success());
        assert_eq!(response.error_message(), Some("SMTP relay refused"));
    }

    #[tokio::test]
    async fn test_invoke_missing_function_returns_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/functions/v1/analyze-pet-image")
            .with_status(404)
            .with_body("Function not found")
            .create_async()
            .await;

        let backend = backend_for(&server);
        let response = backend
            .invoke_function("analyze-pet-image", json!({}))
            .await
            .unwrap();
        assert_eq!(response.status, 404);
        assert!(!response.is_success());
        assert_eq!(response.body, json!("Function not found"));
    }

    #[tokio::test]
    async fn test_error_statuses_are_reported() {
        let mut server = mockito::Server::new_async().await;
        let _settings = server
            .mock("GET", "/auth/v1/settings")
            .with_status(503)
            .with_body("down")
            .create_async()
            .await;
        let _forbidden = server
            .mock("GET", "/rest/v1/profiles")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let backend = backend_for(&server);
        let err = backend.auth_settings().await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), "Backend returned 503: down");

        let err = backend.query("profiles", 1).await.unwrap_err();
        assert!(matches!(err, BackendError::Authentication { status: 403 }));
        assert_eq!(err.status(), Some(403));
    }

    #[tokio::test]
    async fn test_fetch_reports_status_without_erroring() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/rest/v1/")
            .with_status(503)
            .with_body("maintenance")
            .create_async()
            .await;

        let backend = backend_for(&server);
        let response = backend.fetch("/rest/v1/").await.unwrap();
        assert_eq!(response.status, 503);
        assert!(!response.is_success());
        assert_eq!(response.body, "maintenance");
    }
}
