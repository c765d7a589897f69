//! Core value types shared by the registry, the result store and the runner.

use backend::BackendError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Closed set of check categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestCategory {
    Connectivity,
    Database,
    Auth,
    Email,
    Functions,
    Performance,
}

impl TestCategory {
    /// Every category, in display order.
    pub const ALL: [TestCategory; 6] = [
        TestCategory::Connectivity,
        TestCategory::Database,
        TestCategory::Auth,
        TestCategory::Email,
        TestCategory::Functions,
        TestCategory::Performance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TestCategory::Connectivity => "connectivity",
            TestCategory::Database => "database",
            TestCategory::Auth => "auth",
            TestCategory::Email => "email",
            TestCategory::Functions => "functions",
            TestCategory::Performance => "performance",
        }
    }
}

impl fmt::Display for TestCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown test category '{input}' (expected one of: connectivity, database, auth, email, functions, performance)")]
pub struct ParseCategoryError {
    pub input: String,
}

impl FromStr for TestCategory {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        TestCategory::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ParseCategoryError {
                input: s.to_string(),
            })
    }
}

/// Lifecycle status of a single test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Idle,
    Running,
    Pass,
    Fail,
    Warning,
}

impl TestStatus {
    /// Pass, fail or warning.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TestStatus::Pass | TestStatus::Fail | TestStatus::Warning)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestStatus::Idle => "idle",
            TestStatus::Running => "running",
            TestStatus::Pass => "pass",
            TestStatus::Fail => "fail",
            TestStatus::Warning => "warning",
        };
        f.write_str(s)
    }
}

/// Terminal outcome a check reports. Cannot express idle or running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
    Warning,
}

impl Verdict {
    fn default_message(&self) -> &'static str {
        match self {
            Verdict::Pass => "Test passed",
            Verdict::Fail => "Test failed",
            Verdict::Warning => "Test completed with warnings",
        }
    }
}

impl From<Verdict> for TestStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Pass => TestStatus::Pass,
            Verdict::Fail => TestStatus::Fail,
            Verdict::Warning => TestStatus::Warning,
        }
    }
}

/// What a check's body returns on normal completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestOutcome {
    pub verdict: Verdict,
    pub message: String,
    pub details: Option<serde_json::Value>,
    /// Overrides the wall time measured by the runner when set.
    pub duration: Option<Duration>,
}

impl TestOutcome {
    pub fn new(verdict: Verdict, message: impl Into<String>) -> Self {
        Self {
            verdict,
            message: message.into(),
            details: None,
            duration: None,
        }
    }

    pub fn pass(message: impl Into<String>) -> Self {
        Self::new(Verdict::Pass, message)
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self::new(Verdict::Fail, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Verdict::Warning, message)
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// Unexpected failure raised from inside a check body.
#[derive(Error, Debug)]
pub enum TestError {
    #[error("{0}")]
    Backend(#[from] BackendError),

    #[error("{message}")]
    Unexpected { message: String },
}

impl TestError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        TestError::Unexpected {
            message: message.into(),
        }
    }
}

pub type TestExecResult = Result<TestOutcome, TestError>;

/// Latest known state of one registered test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    pub name: String,
    pub category: TestCategory,
    pub critical: bool,
    pub status: TestStatus,
    pub message: String,
    pub duration: Option<Duration>,
    pub start_time: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub details: Option<serde_json::Value>,
}

impl TestResult {
    pub fn idle(
        id: impl Into<String>,
        name: impl Into<String>,
        category: TestCategory,
        critical: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            critical,
            status: TestStatus::Idle,
            message: "Not run yet".to_string(),
            duration: None,
            start_time: None,
            finished_at: None,
            details: None,
        }
    }

    pub fn duration_ms(&self) -> Option<u128> {
        self.duration.map(|d| d.as_millis())
    }

    pub(crate) fn begin(&mut self) {
        self.status = TestStatus::Running;
        self.message = "Running...".to_string();
        self.start_time = Some(Utc::now());
        self.finished_at = None;
        self.duration = None;
    }

    pub(crate) fn complete(&mut self, outcome: TestOutcome, elapsed: Duration) {
        self.message = if outcome.message.trim().is_empty() {
            outcome.verdict.default_message().to_string()
        } else {
            outcome.message
        };
        self.status = outcome.verdict.into();
        self.duration = Some(outcome.duration.unwrap_or(elapsed));
        self.details = outcome.details;
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn fail_with(&mut self, error: &str, elapsed: Duration) {
        let error = if error.trim().is_empty() {
            "unknown error"
        } else {
            error
        };
        self.status = TestStatus::Fail;
        self.message = format!("Test execution failed: {}", error);
        self.duration = Some(elapsed);
        self.details = Some(serde_json::json!({ "error": error }));
        self.finished_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_parsing() {
        assert_eq!("email".parse::<TestCategory>(), Ok(TestCategory::Email));
        assert_eq!(" Database ".parse::<TestCategory>(), Ok(TestCategory::Database));
        let err = "payments".parse::<TestCategory>().unwrap_err();
        assert_eq!(err.input, "payments");
        assert!(err.to_string().contains("payments"));

        for category in TestCategory::ALL {
            assert_eq!(category.to_string().parse::<TestCategory>(), Ok(category));
        }
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&TestCategory::Functions).unwrap();
        assert_eq!(json, "\"functions\"");
        let status = serde_json::to_string(&TestStatus::Warning).unwrap();
        assert_eq!(status, "\"warning\"");
    }

    #[test]
    fn test_status_terminal() {
        assert!(!TestStatus::Idle.is_terminal());
        assert!(!TestStatus::Running.is_terminal());
        assert!(TestStatus::Pass.is_terminal());
        assert!(TestStatus::Fail.is_terminal());
        assert!(TestStatus::Warning.is_terminal());
    }

    #[test]
    fn test_complete_uses_outcome_fields() {
        let mut result = TestResult::idle("db", "Database", TestCategory::Database, true);
        result.begin();
        assert_eq!(result.status, TestStatus::Running);
        assert!(result.start_time.is_some());
        assert!(result.duration.is_none());

        let outcome = TestOutcome::warning("Slow query")
            .with_details(json!({ "ms": 900 }))
            .with_duration(Duration::from_millis(900));
        result.complete(outcome, Duration::from_millis(950));

        assert_eq!(result.status, TestStatus::Warning);
        assert_eq!(result.message, "Slow query");
        assert_eq!(result.duration_ms(), Some(900));
        assert_eq!(result.details, Some(json!({ "ms": 900 })));
        assert!(result.finished_at.is_some());
        assert_eq!(result.category, TestCategory::Database);
        assert!(result.critical);
    }

    #[test]
    fn test_complete_fills_blank_message() {
        let mut result = TestResult::idle("a", "A", TestCategory::Auth, false);
        result.begin();
        result.complete(TestOutcome::pass("   "), Duration::from_millis(3));
        assert_eq!(result.message, "Test passed");
        assert_eq!(result.duration, Some(Duration::from_millis(3)));
    }

    #[test]
    fn test_fail_with_records_error() {
        let mut result = TestResult::idle("a", "A", TestCategory::Auth, false);
        result.begin();
        result.fail_with("connection reset", Duration::from_millis(7));
        assert_eq!(result.status, TestStatus::Fail);
        assert_eq!(result.message, "Test execution failed: connection reset");
        assert_eq!(result.details, Some(json!({ "error": "connection reset" })));
    }

    #[test]
    fn test_error_display() {
        let err = TestError::from(BackendError::Authentication { status: 401 });
        assert_eq!(err.to_string(), "Authentication failed (401)");
        let err = TestError::from(BackendError::ServiceUnavailable {
            message: "Request timeout".to_string(),
        });
        assert_eq!(err.to_string(), "Service unavailable: Request timeout");
        assert_eq!(TestError::unexpected("boom").to_string(), "boom");
    }
}
