//! In-memory execution store using `DashMap`.
//!
//! This is the default backend for tests and embedding - data is lost on
//! process restart. An execution and its samples share one map entry, so
//! creating them is atomic and a sample listing is always a consistent
//! snapshot.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::{
    ExecutionFilter, ExecutionSnapshot, ExecutionStore, Page, Pagination, Precondition,
};
use crate::record::{
    ExecutionRecord, ExecutionStatus, ExportRecord, ExportStatus, MeasurementRecord,
    SampleRecord, SampleStatus,
};
use crate::{Error, Result};

#[derive(Debug)]
struct ExecutionEntry {
    execution: ExecutionRecord,
    samples: Vec<SampleRecord>,
}

/// In-memory execution store backed by lock-free concurrent hashmaps.
///
/// # Example
///
/// ```rust
/// use edith_tracker::store::MemoryStore;
///
/// let store = MemoryStore::new();
/// assert!(store.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    executions: DashMap<String, ExecutionEntry>,
    sample_index: DashMap<String, String>,
    measurements: DashMap<String, Vec<MeasurementRecord>>,
    idempotency: DashMap<(String, String), MeasurementRecord>,
    exports: DashMap<String, ExportRecord>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of executions held.
    #[must_use]
    pub fn execution_count(&self) -> usize {
        self.executions.len()
    }

    /// Number of ledger rows held.
    #[must_use]
    pub fn measurement_count(&self) -> usize {
        self.measurements.iter().map(|rows| rows.len()).sum()
    }

    /// Number of export jobs held.
    #[must_use]
    pub fn export_count(&self) -> usize {
        self.exports.len()
    }

    /// Check if the store holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.executions.is_empty() && self.measurements.is_empty() && self.exports.is_empty()
    }

    fn owner_of(&self, sample_id: &str) -> Option<String> {
        self.sample_index.get(sample_id).map(|id| id.value().clone())
    }
}

impl ExecutionStore for MemoryStore {
    async fn create_execution(
        &self,
        execution: ExecutionRecord,
        samples: Vec<SampleRecord>,
    ) -> Result<()> {
        if let Some(sample) = samples.iter().find(|s| s.execution_id() != execution.id()) {
            return Err(Error::Persistence(format!(
                "sample {} belongs to execution {}, not {}",
                sample.id(),
                sample.execution_id(),
                execution.id()
            )));
        }

        let execution_id = execution.id().to_string();
        let sample_ids: Vec<String> = samples.iter().map(|s| s.id().to_string()).collect();
        match self.executions.entry(execution_id.clone()) {
            Entry::Occupied(_) => {
                return Err(Error::Persistence(format!(
                    "execution {execution_id} already exists"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(ExecutionEntry { execution, samples });
            }
        }
        for sample_id in sample_ids {
            self.sample_index.insert(sample_id, execution_id.clone());
        }
        Ok(())
    }

    async fn get_execution(&self, id: &str) -> Result<Option<ExecutionRecord>> {
        Ok(self.executions.get(id).map(|e| e.execution.clone()))
    }

    async fn list_executions(
        &self,
        filter: &ExecutionFilter,
        pagination: Pagination,
    ) -> Result<Page<ExecutionRecord>> {
        let mut matching: Vec<ExecutionRecord> = self
            .executions
            .iter()
            .filter(|e| filter.matches(&e.execution))
            .map(|e| e.execution.clone())
            .collect();
        matching.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(Page::from_ordered(matching, pagination))
    }

    async fn update_execution(
        &self,
        expected: Precondition<ExecutionStatus>,
        execution: &ExecutionRecord,
    ) -> Result<bool> {
        let Some(mut entry) = self.executions.get_mut(execution.id()) else {
            return Ok(false);
        };
        if entry.execution.precondition() != expected {
            return Ok(false);
        }
        entry.execution = execution.clone();
        Ok(true)
    }

    async fn get_sample(&self, id: &str) -> Result<Option<SampleRecord>> {
        let Some(execution_id) = self.owner_of(id) else {
            return Ok(None);
        };
        Ok(self
            .executions
            .get(&execution_id)
            .and_then(|e| e.samples.iter().find(|s| s.id() == id).cloned()))
    }

    async fn list_samples(&self, execution_id: &str) -> Result<Vec<SampleRecord>> {
        Ok(self
            .executions
            .get(execution_id)
            .map(|e| e.samples.clone())
            .unwrap_or_default())
    }

    async fn update_sample(
        &self,
        expected: Precondition<SampleStatus>,
        sample: &SampleRecord,
    ) -> Result<bool> {
        let Some(mut entry) = self.executions.get_mut(sample.execution_id()) else {
            return Ok(false);
        };
        let Some(slot) = entry.samples.iter_mut().find(|s| s.id() == sample.id()) else {
            return Ok(false);
        };
        if slot.precondition() != expected || slot.sample_number() != sample.sample_number() {
            return Ok(false);
        }
        *slot = sample.clone();
        Ok(true)
    }

    async fn append_measurement(&self, measurement: MeasurementRecord) -> Result<MeasurementRecord> {
        let Some(key) = measurement.idempotency_key().map(str::to_string) else {
            self.measurements
                .entry(measurement.sample_id().to_string())
                .or_default()
                .push(measurement.clone());
            return Ok(measurement);
        };

        match self.idempotency.entry((measurement.sample_id().to_string(), key)) {
            Entry::Occupied(existing) => {
                let original = existing.get();
                if original.step_id() != measurement.step_id()
                    || original.measurement_id() != measurement.measurement_id()
                {
                    return Err(Error::invalid(
                        "idempotencyKey",
                        format!(
                            "key already used for {}/{} on this sample",
                            original.step_id(),
                            original.measurement_id()
                        ),
                    ));
                }
                Ok(original.clone())
            }
            Entry::Vacant(slot) => {
                self.measurements
                    .entry(measurement.sample_id().to_string())
                    .or_default()
                    .push(measurement.clone());
                slot.insert(measurement.clone());
                Ok(measurement)
            }
        }
    }

    async fn list_sample_measurements(&self, sample_id: &str) -> Result<Vec<MeasurementRecord>> {
        Ok(self
            .measurements
            .get(sample_id)
            .map(|rows| rows.clone())
            .unwrap_or_default())
    }

    async fn snapshot(&self, execution_id: &str) -> Result<Option<ExecutionSnapshot>> {
        let Some(entry) = self.executions.get(execution_id) else {
            return Ok(None);
        };
        let measurements = entry
            .samples
            .iter()
            .filter_map(|s| self.measurements.get(s.id()).map(|rows| rows.clone()))
            .flatten()
            .collect();
        Ok(Some(ExecutionSnapshot {
            execution: entry.execution.clone(),
            samples: entry.samples.clone(),
            measurements,
        }))
    }

    async fn create_export(&self, export: &ExportRecord) -> Result<()> {
        match self.exports.entry(export.id().to_string()) {
            Entry::Occupied(_) => Err(Error::Persistence(format!(
                "export {} already exists",
                export.id()
            ))),
            Entry::Vacant(slot) => {
                slot.insert(export.clone());
                Ok(())
            }
        }
    }

    async fn get_export(&self, id: &str) -> Result<Option<ExportRecord>> {
        Ok(self.exports.get(id).map(|e| e.value().clone()))
    }

    async fn list_exports(&self, execution_id: &str) -> Result<Vec<ExportRecord>> {
        let mut exports: Vec<ExportRecord> = self
            .exports
            .iter()
            .filter(|e| e.execution_id() == execution_id)
            .map(|e| e.value().clone())
            .collect();
        exports.sort_by(|a, b| {
            a.requested_at()
                .cmp(&b.requested_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(exports)
    }

    async fn list_open_exports(&self) -> Result<Vec<ExportRecord>> {
        Ok(self
            .exports
            .iter()
            .filter(|e| !e.status().is_terminal())
            .map(|e| e.value().clone())
            .collect())
    }

    async fn update_export(
        &self,
        expected: Precondition<ExportStatus>,
        export: &ExportRecord,
    ) -> Result<bool> {
        let Some(mut stored) = self.exports.get_mut(export.id()) else {
            return Ok(false);
        };
        if stored.precondition() != expected {
            return Ok(false);
        }
        *stored = export.clone();
        Ok(true)
    }
}
