use crate::presentation::CategoryMeta;
use crate::summary::TestSummary;
use crate::types::{TestCategory, TestResult};
use serde::{Deserialize, Serialize};

/// What a suite groups by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "category")]
pub enum SuiteKind {
    Critical,
    Category(TestCategory),
}

/// Derived grouping of results. Never stored; rebuilt on each request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuite {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: SuiteKind,
    pub tests: Vec<TestResult>,
}

impl TestSuite {
    pub fn summary(&self) -> TestSummary {
        TestSummary::from_results(&self.tests)
    }
}

/// Critical suite first, then one suite per non-empty category.
pub fn build_suites(results: &[TestResult]) -> Vec<TestSuite> {
    let mut suites = Vec::new();

    let critical: Vec<TestResult> = results.iter().filter(|r| r.critical).cloned().collect();
    if !critical.is_empty() {
        suites.push(TestSuite {
            id: "critical".to_string(),
            name: "Critical".to_string(),
            description: "Checks the platform cannot operate without".to_string(),
            kind: SuiteKind::Critical,
            tests: critical,
        });
    }

    for category in TestCategory::ALL {
        let tests: Vec<TestResult> = results
            .iter()
            .filter(|r| r.category == category)
            .cloned()
            .collect();
        if tests.is_empty() {
            continue;
        }

        let meta: &CategoryMeta = category.meta();
        suites.push(TestSuite {
            id: category.as_str().to_string(),
            name: meta.label.to_string(),
            description: meta.description.to_string(),
            kind: SuiteKind::Category(category),
            tests,
        });
    }

    suites
}
