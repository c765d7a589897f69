use crate::types::{TestCategory, TestExecResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Test id '{id}' is already registered")]
    DuplicateId { id: String },

    #[error("Test id cannot be empty")]
    EmptyId,
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Body of a health check.
#[async_trait]
pub trait DiagnosticTest: Send + Sync {
    async fn execute(&self) -> TestExecResult;
}

/// Adapts an async closure into a [`DiagnosticTest`].
struct FnTest<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> DiagnosticTest for FnTest<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TestExecResult> + Send + 'static,
{
    async fn execute(&self) -> TestExecResult {
        (self.f)().await
    }
}

/// Immutable description of a registered check.
#[derive(Clone)]
pub struct TestDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: TestCategory,
    pub critical: bool,
    test: Arc<dyn DiagnosticTest>,
}

impl TestDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: TestCategory,
        test: impl DiagnosticTest + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            category,
            critical: false,
            test: Arc::new(test),
        }
    }

    pub fn from_fn<F, Fut>(
        id: impl Into<String>,
        name: impl Into<String>,
        category: TestCategory,
        f: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TestExecResult> + Send + 'static,
    {
        Self::new(id, name, category, FnTest { f })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_critical(mut self, critical: bool) -> Self {
        self.critical = critical;
        self
    }

    pub async fn execute(&self) -> TestExecResult {
        self.test.execute().await
    }
}

impl fmt::Debug for TestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("category", &self.category)
            .field("critical", &self.critical)
            .finish_non_exhaustive()
    }
}

/// Static list of checks, kept in registration order.
#[derive(Debug, Default)]
pub struct TestRegistry {
    tests: Vec<TestDescriptor>,
    index: HashMap<String, usize>,
}

impl TestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, descriptor: TestDescriptor) -> RegistryResult<()> {
        if descriptor.id.trim().is_empty() {
            return Err(RegistryError::EmptyId);
        }
        if self.index.contains_key(&descriptor.id) {
            return Err(RegistryError::DuplicateId {
                id: descriptor.id.clone(),
            });
        }

        self.index.insert(descriptor.id.clone(), self.tests.len());
        self.tests.push(descriptor);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&TestDescriptor> {
        self.index.get(id).map(|&i| &self.tests[i])
    }

    pub fn get_all(&self) -> &[TestDescriptor] {
        &self.tests
    }

    pub fn get_by_category(&self, category: TestCategory) -> Vec<&TestDescriptor> {
        self.tests
            .iter()
            .filter(|t| t.category == category)
            .collect()
    }

    pub fn get_critical(&self) -> Vec<&TestDescriptor> {
        self.tests.iter().filter(|t| t.critical).collect()
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}
