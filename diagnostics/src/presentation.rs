//! Display metadata for categories and statuses.
//!
//! Renderers look things up here instead of matching on categories or
//! statuses themselves.

use crate::types::{TestCategory, TestStatus};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryMeta {
    pub category: TestCategory,
    pub label: &'static str,
    /// Short fixed-width tag for tables.
    pub tag: &'static str,
    pub description: &'static str,
}

const CATEGORY_META: [CategoryMeta; 6] = [
    CategoryMeta {
        category: TestCategory::Connectivity,
        label: "Connectivity",
        tag: "NET",
        description: "Backend reachability and REST gateway",
    },
    CategoryMeta {
        category: TestCategory::Database,
        label: "Database",
        tag: "DB",
        description: "Table reads against the hosted database",
    },
    CategoryMeta {
        category: TestCategory::Auth,
        label: "Authentication",
        tag: "AUTH",
        description: "Auth service settings and session lookup",
    },
    CategoryMeta {
        category: TestCategory::Email,
        label: "Email",
        tag: "MAIL",
        description: "Transactional email delivery function",
    },
    CategoryMeta {
        category: TestCategory::Functions,
        label: "Edge Functions",
        tag: "FN",
        description: "Trainer chat and image analysis functions",
    },
    CategoryMeta {
        category: TestCategory::Performance,
        label: "Performance",
        tag: "PERF",
        description: "Query latency against warning thresholds",
    },
];

impl TestCategory {
    pub fn meta(&self) -> &'static CategoryMeta {
        // CATEGORY_META is declared in the same order as TestCategory::ALL.
        &CATEGORY_META[*self as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BadgeSeverity {
    Neutral,
    Info,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
    pub label: &'static str,
    pub symbol: &'static str,
    pub severity: BadgeSeverity,
}

const STATUS_BADGES: [(TestStatus, StatusBadge); 5] = [
    (
        TestStatus::Idle,
        StatusBadge {
            label: "IDLE",
            symbol: "○",
            severity: BadgeSeverity::Neutral,
        },
    ),
    (
        TestStatus::Running,
        StatusBadge {
            label: "RUNNING",
            symbol: "…",
            severity: BadgeSeverity::Info,
        },
    ),
    (
        TestStatus::Pass,
        StatusBadge {
            label: "PASS",
            symbol: "✓",
            severity: BadgeSeverity::Success,
        },
    ),
    (
        TestStatus::Fail,
        StatusBadge {
            label: "FAIL",
            symbol: "✗",
            severity: BadgeSeverity::Danger,
        },
    ),
    (
        TestStatus::Warning,
        StatusBadge {
            label: "WARN",
            symbol: "!",
            severity: BadgeSeverity::Warning,
        },
    ),
];

impl TestStatus {
    pub fn badge(&self) -> &'static StatusBadge {
        &STATUS_BADGES[*self as usize].1
    }
}
