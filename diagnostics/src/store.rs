use crate::registry::TestRegistry;
use crate::types::TestResult;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum StoreError {
    #[error("No result slot for test id '{id}'")]
    UnknownId { id: String },

    #[error("Result for '{id}' changes the registered test's identity")]
    IdentityMismatch { id: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Latest result per test id. Seeded with one idle entry per registered test,
/// so lookups by a registered id always succeed.
///
/// Only the run state of an entry may change: `id`, `name`, `category` and
/// `critical` stay as registered.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: Vec<TestResult>,
    index: HashMap<String, usize>,
    revision: u64,
}

impl ResultStore {
    pub fn from_registry(registry: &TestRegistry) -> Self {
        let mut store = Self::default();
        for descriptor in registry.get_all() {
            store
                .index
                .insert(descriptor.id.clone(), store.results.len());
            store.results.push(TestResult::idle(
                descriptor.id.clone(),
                descriptor.name.clone(),
                descriptor.category,
                descriptor.critical,
            ));
        }
        store
    }

    pub fn get(&self, id: &str) -> Option<&TestResult> {
        self.index.get(id).map(|&i| &self.results[i])
    }

    /// Snapshot of every result in registration order.
    pub fn get_all(&self) -> Vec<TestResult> {
        self.results.clone()
    }

    pub fn set(&mut self, id: &str, result: TestResult) -> StoreResult<()> {
        let slot = self
            .index
            .get(id)
            .and_then(|&i| self.results.get_mut(i))
            .ok_or_else(|| StoreError::UnknownId { id: id.to_string() })?;

        if result.id != slot.id
            || result.name != slot.name
            || result.category != slot.category
            || result.critical != slot.critical
        {
            return Err(StoreError::IdentityMismatch { id: id.to_string() });
        }

        *slot = result;
        self.revision += 1;
        Ok(())
    }

    /// Number of successful writes so far. Later snapshots carry a higher revision.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
