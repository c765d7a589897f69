//! Built-in health checks for the pet-training platform backend.
//!
//! Each check talks to the backend through a shared [`BackendClient`] and
//! turns what it sees into a [`TestOutcome`]. Expected failure modes (error
//! status codes, missing sessions, slow responses) become `fail` or
//! `warning` outcomes carrying the service and status. Transport errors
//! (timeouts, refused connections, undecodable bodies) are returned as
//! [`TestError`](crate::types::TestError) and recorded as failures by the
//! runner.

use crate::registry::{DiagnosticTest, RegistryResult, TestDescriptor, TestRegistry};
use crate::types::{TestCategory, TestExecResult, TestOutcome};
use async_trait::async_trait;
use backend::{BackendClient, BackendError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Latency limits above which a check reports `warning`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckThresholds {
    pub slow_response_ms: u64,
    pub slow_query_ms: u64,
}

impl Default for CheckThresholds {
    fn default() -> Self {
        Self {
            slow_response_ms: 1000,
            slow_query_ms: 500,
        }
    }
}

impl CheckThresholds {
    pub fn validate(&self) -> Result<(), String> {
        if self.slow_response_ms == 0 {
            return Err("slow_response_ms must be greater than 0".to_string());
        }
        if self.slow_query_ms == 0 {
            return Err("slow_query_ms must be greater than 0".to_string());
        }
        Ok(())
    }
}

pub struct ConnectivityCheck {
    client: Arc<dyn BackendClient>,
    slow_after: Duration,
}

impl ConnectivityCheck {
    pub fn new(client: Arc<dyn BackendClient>, slow_after: Duration) -> Self {
        Self { client, slow_after }
    }
}

#[async_trait]
impl DiagnosticTest for ConnectivityCheck {
    async fn execute(&self) -> TestExecResult {
        match self.client.ping().await {
            Ok(latency) => {
                let details = json!({
                    "latency_ms": latency.as_millis() as u64,
                    "threshold_ms": self.slow_after.as_millis() as u64,
                    "provider": self.client.provider_name(),
                });
                let outcome = if latency > self.slow_after {
                    TestOutcome::warning(format!(
                        "Backend reachable but slow ({}ms)",
                        latency.as_millis()
                    ))
                } else {
                    TestOutcome::pass(format!("Backend reachable in {}ms", latency.as_millis()))
                };
                Ok(outcome.with_details(details).with_duration(latency))
            }
            Err(e) => Ok(TestOutcome::fail(format!("Backend unreachable: {}", e))
                .with_details(json!({ "error": e.to_string() }))),
        }
    }
}

/// `fail` outcome for a backend that answered with an error status.
/// Anything without a status is a transport failure and stays an error.
fn rejected(service: &str, error: BackendError) -> TestExecResult {
    let Some(status) = error.status() else {
        return Err(error.into());
    };
    let reason = match &error {
        BackendError::Http { body, .. } if !body.trim().is_empty() => body.trim().to_string(),
        BackendError::Http { .. } => "empty response".to_string(),
        BackendError::Authentication { .. } => "access denied".to_string(),
        BackendError::NotFound { resource } => format!("{} not found", resource),
        other => other.to_string(),
    };

    Ok(
        TestOutcome::fail(format!("{} returned {}: {}", service, status, reason))
            .with_details(json!({ "status": status, "error": error.to_string() })),
    )
}

/// Raw GET against a backend path; any 2xx passes.
pub struct EndpointCheck {
    client: Arc<dyn BackendClient>,
    path: String,
}

impl EndpointCheck {
    pub fn new(client: Arc<dyn BackendClient>, path: impl Into<String>) -> Self {
        Self {
            client,
            path: path.into(),
        }
    }
}

#[async_trait]
impl DiagnosticTest for EndpointCheck {
    async fn execute(&self) -> TestExecResult {
        let response = self.client.fetch(&self.path).await?;
        let details = json!({ "url": response.url, "status": response.status });

        let outcome = if response.is_success() {
            TestOutcome::pass(format!("{} responded {}", self.path, response.status))
        } else {
            TestOutcome::fail(format!(
                "{} responded {}: {}",
                self.path,
                response.status,
                response.body.trim()
            ))
        };
        Ok(outcome.with_details(details))
    }
}

pub struct TableQueryCheck {
    client: Arc<dyn BackendClient>,
    table: String,
    limit: usize,
}

impl TableQueryCheck {
    pub fn new(client: Arc<dyn BackendClient>, table: impl Into<String>, limit: usize) -> Self {
        Self {
            client,
            table: table.into(),
            limit,
        }
    }
}

#[async_trait]
impl DiagnosticTest for TableQueryCheck {
    async fn execute(&self) -> TestExecResult {
        match self.client.query(&self.table, self.limit).await {
            Ok(response) => {
                let total = response
                    .count
                    .map(|c| format!(" of {}", c))
                    .unwrap_or_default();
                Ok(TestOutcome::pass(format!(
                    "Read {} rows{} from {}",
                    response.row_count(),
                    total,
                    self.table
                ))
                .with_details(json!({
                    "table": self.table,
                    "rows": response.row_count(),
                    "count": response.count,
                })))
            }
            Err(e) => Ok(
                TestOutcome::fail(format!("Query on {} failed: {}", self.table, e))
                    .with_details(json!({ "table": self.table, "error": e.to_string() })),
            ),
        }
    }
}

pub struct AuthServiceCheck {
    client: Arc<dyn BackendClient>,
}

impl AuthServiceCheck {
    pub fn new(client: Arc<dyn BackendClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DiagnosticTest for AuthServiceCheck {
    async fn execute(&self) -> TestExecResult {
        let settings = match self.client.auth_settings().await {
            Ok(settings) => settings,
            Err(e) => return rejected("Auth service", e),
        };
        let providers: Vec<String> = settings
            .get("external")
            .and_then(|e| e.as_object())
            .map(|providers| {
                providers
                    .iter()
                    .filter(|(_, enabled)| enabled.as_bool().unwrap_or(false))
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default();

        if providers.is_empty() {
            return Ok(TestOutcome::warning(
                "Auth service reachable but no sign-in providers are enabled",
            )
            .with_details(settings));
        }

        Ok(TestOutcome::pass(format!(
            "Auth service reachable ({} providers enabled)",
            providers.len()
        ))
        .with_details(json!({ "providers": providers })))
    }
}

pub struct SessionCheck {
    client: Arc<dyn BackendClient>,
    access_token: Option<String>,
}

impl SessionCheck {
    pub fn new(client: Arc<dyn BackendClient>, access_token: Option<String>) -> Self {
        Self {
            client,
            access_token,
        }
    }
}

#[async_trait]
impl DiagnosticTest for SessionCheck {
    async fn execute(&self) -> TestExecResult {
        let session = match self.client.get_session(self.access_token.as_deref()).await {
            Ok(session) => session,
            Err(e) => return rejected("Session lookup", e),
        };

        match session {
            Some(session) => Ok(TestOutcome::pass(format!(
                "Active session for user {}",
                session.user_id
            ))
            .with_details(json!({ "user_id": session.user_id, "email": session.email }))),
            None => Ok(TestOutcome::warning("No active session")
                .with_details(json!({ "token_supplied": self.access_token.is_some() }))),
        }
    }
}

/// Invokes a serverless function and checks the response status.
pub struct FunctionCheck {
    client: Arc<dyn BackendClient>,
    function: String,
    payload: serde_json::Value,
    slow_after: Duration,
}

impl FunctionCheck {
    pub fn new(
        client: Arc<dyn BackendClient>,
        function: impl Into<String>,
        payload: serde_json::Value,
        slow_after: Duration,
    ) -> Self {
        Self {
            client,
            function: function.into(),
            payload,
            slow_after,
        }
    }
}

#[async_trait]
impl DiagnosticTest for FunctionCheck {
    async fn execute(&self) -> TestExecResult {
        let started = Instant::now();
        let response = match self
            .client
            .invoke_function(&self.function, self.payload.clone())
            .await
        {
            Ok(response) => response,
            Err(e) => return rejected(&format!("Function {}", self.function), e),
        };
        let elapsed = started.elapsed();

        let details = json!({
            "function": self.function,
            "status": response.status,
            "response": response.body,
            "latency_ms": elapsed.as_millis() as u64,
        });

        let outcome = if !response.is_success() {
            let reason = response
                .error_message()
                .or_else(|| response.body.as_str().map(str::trim).filter(|b| !b.is_empty()))
                .unwrap_or("no error message")
                .to_string();
            TestOutcome::fail(format!(
                "Function {} returned {}: {}",
                self.function, response.status, reason
            ))
        } else if elapsed > self.slow_after {
            TestOutcome::warning(format!(
                "Function {} responded slowly ({}ms)",
                self.function,
                elapsed.as_millis()
            ))
        } else {
            TestOutcome::pass(format!(
                "Function {} responded in {}ms",
                self.function,
                elapsed.as_millis()
            ))
        };

        Ok(outcome.with_details(details).with_duration(elapsed))
    }
}

/// Repeats a small query and compares the average latency to a threshold.
pub struct QueryPerformanceCheck {
    client: Arc<dyn BackendClient>,
    table: String,
    samples: usize,
    slow_after: Duration,
}

impl QueryPerformanceCheck {
    pub fn new(
        client: Arc<dyn BackendClient>,
        table: impl Into<String>,
        samples: usize,
        slow_after: Duration,
    ) -> Self {
        Self {
            client,
            table: table.into(),
            samples: samples.max(1),
            slow_after,
        }
    }
}

#[async_trait]
impl DiagnosticTest for QueryPerformanceCheck {
    async fn execute(&self) -> TestExecResult {
        let mut samples = Vec::with_capacity(self.samples);
        for _ in 0..self.samples {
            let started = Instant::now();
            if let Err(e) = self.client.query(&self.table, 1).await {
                return Ok(TestOutcome::fail(format!(
                    "Query {} of {} on {} failed: {}",
                    samples.len() + 1,
                    self.samples,
                    self.table,
                    e
                ))
                .with_details(json!({ "error": e.to_string() })));
            }
            samples.push(started.elapsed());
        }

        let total: Duration = samples.iter().sum();
        let average = total / samples.len() as u32;
        let samples_ms: Vec<u64> = samples.iter().map(|d| d.as_millis() as u64).collect();
        let details = json!({
            "table": self.table,
            "samples_ms": samples_ms,
            "average_ms": average.as_millis() as u64,
            "threshold_ms": self.slow_after.as_millis() as u64,
        });

        let outcome = if average > self.slow_after {
            TestOutcome::warning(format!(
                "Average query time {}ms exceeds {}ms",
                average.as_millis(),
                self.slow_after.as_millis()
            ))
        } else {
            TestOutcome::pass(format!("Average query time {}ms", average.as_millis()))
        };
        Ok(outcome.with_details(details).with_duration(total))
    }
}

/// Registers the platform's standard diagnostics.
pub fn default_registry(
    client: Arc<dyn BackendClient>,
    thresholds: CheckThresholds,
    access_token: Option<String>,
) -> RegistryResult<TestRegistry> {
    let slow_response = Duration::from_millis(thresholds.slow_response_ms);
    let slow_query = Duration::from_millis(thresholds.slow_query_ms);

    let descriptors = vec![
        TestDescriptor::new(
            "backend-connectivity",
            "Backend connectivity",
            TestCategory::Connectivity,
            ConnectivityCheck::new(client.clone(), slow_response),
        )
        .with_description("Ping the hosted backend and measure round-trip latency")
        .with_critical(true),
        TestDescriptor::new(
            "rest-endpoint",
            "REST endpoint",
            TestCategory::Connectivity,
            EndpointCheck::new(client.clone(), "rest/v1/"),
        )
        .with_description("Fetch the REST gateway root"),
        TestDescriptor::new(
            "database-profiles",
            "Profiles table",
            TestCategory::Database,
            TableQueryCheck::new(client.clone(), "profiles", 1),
        )
        .with_description("Read a row from the user profiles table")
        .with_critical(true),
        TestDescriptor::new(
            "database-community",
            "Community posts",
            TestCategory::Database,
            TableQueryCheck::new(client.clone(), "community_posts", 5),
        )
        .with_description("Read recent community posts"),
        TestDescriptor::new(
            "auth-service",
            "Auth service",
            TestCategory::Auth,
            AuthServiceCheck::new(client.clone()),
        )
        .with_description("Load auth settings and enabled sign-in providers")
        .with_critical(true),
        TestDescriptor::new(
            "auth-session",
            "Session lookup",
            TestCategory::Auth,
            SessionCheck::new(client.clone(), access_token),
        )
        .with_description("Resolve the current user session"),
        TestDescriptor::new(
            "email-function",
            "Email delivery",
            TestCategory::Email,
            FunctionCheck::new(
                client.clone(),
                "send-email",
                json!({ "test": true }),
                slow_response,
            ),
        )
        .with_description("Invoke the email function in test mode"),
        TestDescriptor::new(
            "chat-function",
            "Trainer chat",
            TestCategory::Functions,
            FunctionCheck::new(
                client.clone(),
                "chat-with-trainer",
                json!({ "message": "ping", "healthCheck": true }),
                slow_response,
            ),
        )
        .with_description("Invoke the AI trainer chat function"),
        TestDescriptor::new(
            "image-analysis-function",
            "Image analysis",
            TestCategory::Functions,
            FunctionCheck::new(
                client.clone(),
                "analyze-pet-image",
                json!({ "healthCheck": true }),
                slow_response,
            ),
        )
        .with_description("Invoke the pet image analysis function"),
        TestDescriptor::new(
            "query-performance",
            "Query performance",
            TestCategory::Performance,
            QueryPerformanceCheck::new(client, "profiles", 3, slow_query),
        )
        .with_description("Average latency of repeated profile reads"),
    ];

    let mut registry = TestRegistry::new();
    for descriptor in descriptors {
        registry.register(descriptor)?;
    }
    Ok(registry)
}
