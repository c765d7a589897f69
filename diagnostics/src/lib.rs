pub mod bus;
pub mod checks;
pub mod config;
pub mod presentation;
pub mod registry;
pub mod report;
pub mod runner;
pub mod store;
pub mod suite;
pub mod summary;
pub mod types;

pub use bus::{ResultBus, ResultCallback, Subscription};
pub use checks::{
    default_registry, AuthServiceCheck, CheckThresholds, ConnectivityCheck, EndpointCheck,
    FunctionCheck, QueryPerformanceCheck, SessionCheck, TableQueryCheck,
};
pub use config::{BackendSection, ConfigError, ConfigResult, DiagnosticsConfig};
pub use presentation::{BadgeSeverity, CategoryMeta, StatusBadge};
pub use registry::{DiagnosticTest, RegistryError, RegistryResult, TestDescriptor, TestRegistry};
pub use report::{
    render_live_line, render_report, DiagnosticsReport, ReportError, ReportFormat, ReportResult,
};
pub use runner::{DiagnosticRunner, RunnerError, RunnerResult};
pub use store::{ResultStore, StoreError, StoreResult};
pub use suite::{build_suites, SuiteKind, TestSuite};
pub use summary::{OverallHealth, TestSummary};
pub use types::{
    ParseCategoryError, TestCategory, TestError, TestExecResult, TestOutcome, TestResult,
    TestStatus, Verdict,
};
