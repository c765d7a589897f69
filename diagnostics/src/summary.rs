use crate::types::{TestResult, TestStatus};
use serde::{Deserialize, Serialize};

/// Roll-up health of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Healthy,
    Degraded,
    Unhealthy,
    /// Nothing has finished yet.
    Unknown,
}

/// Counts derived from a result snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub warnings: usize,
    pub running: usize,
    pub idle: usize,
    pub critical: usize,
    pub critical_passed: usize,
    pub critical_failed: usize,
}

impl TestSummary {
    pub fn from_results(results: &[TestResult]) -> Self {
        let count = |status: TestStatus| results.iter().filter(|r| r.status == status).count();
        let critical = || results.iter().filter(|r| r.critical);

        Self {
            total: results.len(),
            passed: count(TestStatus::Pass),
            failed: count(TestStatus::Fail),
            warnings: count(TestStatus::Warning),
            running: count(TestStatus::Running),
            idle: count(TestStatus::Idle),
            critical: critical().count(),
            critical_passed: critical()
                .filter(|r| r.status == TestStatus::Pass)
                .count(),
            critical_failed: critical()
                .filter(|r| r.status == TestStatus::Fail)
                .count(),
        }
    }

    pub fn completed(&self) -> usize {
        self.passed + self.failed + self.warnings
    }

    pub fn overall(&self) -> OverallHealth {
        if self.critical_failed > 0 || self.failed > 0 {
            OverallHealth::Unhealthy
        } else if self.warnings > 0 {
            OverallHealth::Degraded
        } else if self.passed == 0 {
            OverallHealth::Unknown
        } else {
            OverallHealth::Healthy
        }
    }

    /// Process exit code: 0 all pass, 1 any failure, 2 warnings without failures.
    pub fn exit_code(&self) -> i32 {
        if self.failed > 0 {
            1
        } else if self.warnings > 0 {
            2
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TestCategory;

    fn result(id: &str, critical: bool, status: TestStatus) -> TestResult {
        let mut result = TestResult::idle(id, id, TestCategory::Database, critical);
        result.status = status;
        result
    }

    #[test]
    fn test_counts_add_up() {
        let results = vec![
            result("a", true, TestStatus::Pass),
            result("b", true, TestStatus::Fail),
            result("c", false, TestStatus::Warning),
            result("d", false, TestStatus::Running),
            result("e", false, TestStatus::Idle),
            result("f", false, TestStatus::Pass),
        ];
        let summary = TestSummary::from_results(&results);

        assert_eq!(summary.total, 6);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.running, 1);
        assert_eq!(summary.idle, 1);
        assert_eq!(summary.critical, 2);
        assert_eq!(summary.critical_passed, 1);
        assert_eq!(summary.critical_failed, 1);
        assert_eq!(
            summary.passed + summary.failed + summary.warnings + summary.running + summary.idle,
            summary.total
        );
        assert_eq!(summary.completed(), 4);
    }

    #[test]
    fn test_overall_and_exit_code() {
        let empty = TestSummary::from_results(&[]);
        assert_eq!(empty.total, 0);
        assert_eq!(empty.overall(), OverallHealth::Unknown);
        assert_eq!(empty.exit_code(), 0);

        let healthy = TestSummary::from_results(&[result("a", true, TestStatus::Pass)]);
        assert_eq!(healthy.overall(), OverallHealth::Healthy);
        assert_eq!(healthy.exit_code(), 0);

        let degraded = TestSummary::from_results(&[
            result("a", true, TestStatus::Pass),
            result("b", false, TestStatus::Warning),
        ]);
        assert_eq!(degraded.overall(), OverallHealth::Degraded);
        assert_eq!(degraded.exit_code(), 2);

        let unhealthy = TestSummary::from_results(&[
            result("a", false, TestStatus::Fail),
            result("b", false, TestStatus::Warning),
        ]);
        assert_eq!(unhealthy.overall(), OverallHealth::Unhealthy);
        assert_eq!(unhealthy.exit_code(), 1);
    }
}
