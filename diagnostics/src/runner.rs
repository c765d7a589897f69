//! Execution engine for the diagnostic test suite.
//!
//! The runner owns the result store and the notification bus. Each
//! [`DiagnosticRunner::run_test`] call publishes exactly two snapshots: one
//! when the test enters `running`, one when it reaches a terminal status.
//! When runs on other threads overlap, a snapshot superseded before delivery
//! is skipped.
//!
//! # Examples
//!
//! ```rust
//! use diagnostics::{DiagnosticRunner, TestCategory, TestDescriptor, TestOutcome, TestRegistry};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut registry = TestRegistry::new();
//! registry.register(
//!     TestDescriptor::from_fn("ping", "Ping", TestCategory::Connectivity, || async {
//!         Ok(TestOutcome::pass("reachable"))
//!     })
//!     .with_critical(true),
//! )?;
//!
//! let runner = DiagnosticRunner::new(registry);
//! let subscription = runner.subscribe(|results| println!("{} results", results.len()));
//! runner.run_all_tests().await;
//! subscription.unsubscribe();
//!
//! assert_eq!(runner.get_summary().passed, 1);
//! # Ok(())
//! # }
//! ```

use crate::bus::{ResultBus, Subscription};
use crate::registry::{TestDescriptor, TestRegistry};
use crate::store::{ResultStore, StoreError};
use crate::suite::{build_suites, TestSuite};
use crate::summary::TestSummary;
use crate::types::{TestCategory, TestResult, TestStatus};
use futures::future::join_all;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Mutex, PoisonError};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RunnerError {
    #[error("Test not found: {id}")]
    TestNotFound { id: String },

    #[error("Result store error: {0}")]
    Store(#[from] StoreError),
}

pub type RunnerResult<T> = Result<T, RunnerError>;

/// Runs registered checks and publishes result snapshots.
///
/// The runner may be shared across tasks and threads. Snapshots reach
/// subscribers in store revision order: one that is older than a snapshot
/// already delivered is dropped, so observers always end on the latest state.
/// Deliveries are serialized, so a callback must not block on another run.
pub struct DiagnosticRunner {
    registry: TestRegistry,
    store: Mutex<ResultStore>,
    bus: ResultBus,
    /// Store revision of the last snapshot handed to the bus.
    published: Mutex<u64>,
}

impl DiagnosticRunner {
    pub fn new(registry: TestRegistry) -> Self {
        let store = ResultStore::from_registry(&registry);
        info!("Diagnostic runner ready with {} tests", registry.len());
        Self {
            registry,
            store: Mutex::new(store),
            bus: ResultBus::new(),
            published: Mutex::new(0),
        }
    }

    pub fn registry(&self) -> &TestRegistry {
        &self.registry
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[TestResult]) + Send + Sync + 'static,
    {
        self.bus.subscribe(callback)
    }

    pub fn get_results(&self) -> Vec<TestResult> {
        self.lock_store().get_all()
    }

    pub fn get_result(&self, id: &str) -> Option<TestResult> {
        self.lock_store().get(id).cloned()
    }

    pub fn get_test_suites(&self) -> Vec<TestSuite> {
        build_suites(&self.get_results())
    }

    pub fn get_summary(&self) -> TestSummary {
        TestSummary::from_results(&self.get_results())
    }

    /// Run one test and return its finalized result.
    ///
    /// Errors only when `id` is not registered; failures inside the check
    /// are recorded as a `fail` result instead.
    pub async fn run_test(&self, id: &str) -> RunnerResult<TestResult> {
        let descriptor = self
            .registry
            .get(id)
            .cloned()
            .ok_or_else(|| RunnerError::TestNotFound { id: id.to_string() })?;

        let running = self.begin(&descriptor)?;

        let started = Instant::now();
        let outcome = AssertUnwindSafe(descriptor.execute()).catch_unwind().await;
        let elapsed = started.elapsed();

        let mut finished = running;
        match outcome {
            Ok(Ok(outcome)) => finished.complete(outcome, elapsed),
            Ok(Err(err)) => {
                warn!("Test {} raised an error: {}", descriptor.id, err);
                finished.fail_with(&err.to_string(), elapsed);
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                error!("Test {} panicked: {}", descriptor.id, message);
                finished.fail_with(&message, elapsed);
            }
        }

        match finished.status {
            TestStatus::Fail => warn!("Test {} failed: {}", finished.id, finished.message),
            TestStatus::Warning => warn!("Test {} warned: {}", finished.id, finished.message),
            _ => debug!("Test {} -> {} in {:?}", finished.id, finished.status, elapsed),
        }

        self.commit(finished)
    }

    /// Critical tests one at a time in registration order, then every
    /// non-critical test concurrently.
    pub async fn run_all_tests(&self) -> Vec<TestResult> {
        let (critical, non_critical): (Vec<&TestDescriptor>, Vec<&TestDescriptor>) =
            self.registry.get_all().iter().partition(|t| t.critical);
        info!(
            "Running all tests ({} critical, {} non-critical)",
            critical.len(),
            non_critical.len()
        );

        for descriptor in critical {
            self.run_registered(&descriptor.id).await;
        }
        join_all(non_critical.iter().map(|t| self.run_registered(&t.id))).await;

        let results = self.get_results();
        let summary = TestSummary::from_results(&results);
        info!(
            "All tests finished: {} passed, {} failed, {} warnings",
            summary.passed, summary.failed, summary.warnings
        );
        results
    }

    /// Run every test in `category` concurrently and return that category's results.
    pub async fn run_tests_by_category(&self, category: TestCategory) -> Vec<TestResult> {
        let descriptors = self.registry.get_by_category(category);
        info!("Running {} {} tests", descriptors.len(), category);

        join_all(descriptors.iter().map(|t| self.run_registered(&t.id))).await;

        self.get_results()
            .into_iter()
            .filter(|r| r.category == category)
            .collect()
    }

    /// Run the critical tests sequentially in registration order.
    pub async fn run_critical_tests(&self) -> Vec<TestResult> {
        let descriptors = self.registry.get_critical();
        info!("Running {} critical tests", descriptors.len());

        for descriptor in &descriptors {
            self.run_registered(&descriptor.id).await;
        }

        self.get_results().into_iter().filter(|r| r.critical).collect()
    }

    async fn run_registered(&self, id: &str) {
        if let Err(e) = self.run_test(id).await {
            error!("Registered test {} could not run: {}", id, e);
        }
    }

    fn begin(&self, descriptor: &TestDescriptor) -> RunnerResult<TestResult> {
        let (running, revision, snapshot) = {
            let mut store = self.lock_store();
            let mut result = store
                .get(&descriptor.id)
                .cloned()
                .ok_or_else(|| StoreError::UnknownId {
                    id: descriptor.id.clone(),
                })?;

            if result.status == TestStatus::Running {
                warn!(
                    "Test {} started while a previous run is in flight; last write wins",
                    descriptor.id
                );
            }

            result.begin();
            store.set(&descriptor.id, result.clone())?;
            (result, store.revision(), store.get_all())
        };

        debug!("Test {} -> running", descriptor.id);
        self.publish(revision, &snapshot);
        Ok(running)
    }

    fn commit(&self, result: TestResult) -> RunnerResult<TestResult> {
        let (revision, snapshot) = {
            let mut store = self.lock_store();
            store.set(&result.id, result.clone())?;
            (store.revision(), store.get_all())
        };

        self.publish(revision, &snapshot);
        Ok(result)
    }

    fn publish(&self, revision: u64, snapshot: &[TestResult]) {
        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);
        if revision <= *published {
            debug!(
                "Dropping snapshot at revision {} (already published {})",
                revision, *published
            );
            return;
        }
        *published = revision;
        self.bus.notify(snapshot);
    }

    fn lock_store(&self) -> std::sync::MutexGuard<'_, ResultStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "test panicked".to_string()
    }
}
