//! Persistence seam for the execution tracker
//!
//! The tracker's state machines are pure; everything durable goes through
//! [`ExecutionStore`]. Any backend (relational, document, in-memory) can
//! implement it as long as it honours two guarantees:
//!
//! - an execution and its full sample set are created atomically;
//! - updates are conditional on the [`Precondition`] the caller read, so two
//!   racing writers cannot both succeed.
//!
//! # Example
//!
//! ```rust
//! use edith_tracker::record::{ExecutionRecord, Operator, SampleRecord};
//! use edith_tracker::store::{ExecutionStore, MemoryStore};
//!
//! # async fn example() -> edith_tracker::Result<()> {
//! let store = MemoryStore::new();
//! let execution = ExecutionRecord::builder("Stability", "ICH Q1A", "stability", Operator::new("op-1"))
//!     .total_steps(1)
//!     .build();
//! let samples = vec![SampleRecord::new(execution.id(), 1, "A")];
//! store.create_execution(execution.clone(), samples).await?;
//!
//! assert_eq!(store.list_samples(execution.id()).await?.len(), 1);
//! # Ok(())
//! # }
//! ```

mod memory;
mod query;

pub use memory::MemoryStore;
pub use query::{ExecutionFilter, Page, Pagination};

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::record::{
    ExecutionRecord, ExecutionStatus, ExportRecord, ExportStatus, MeasurementRecord,
    SampleRecord, SampleStatus,
};
use crate::Result;

/// State a conditional write expects to find in the store.
///
/// Every transition bumps the record version, so matching on the version
/// also rules out ABA interleavings that a status-only check would miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Precondition<S> {
    /// Status the writer read.
    pub status: S,
    /// Version the writer read.
    pub version: u64,
}

/// Execution with its samples and measurement ledger, read consistently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSnapshot {
    /// The execution record.
    pub execution: ExecutionRecord,
    /// Samples ordered by sample number.
    pub samples: Vec<SampleRecord>,
    /// Ledger rows ordered by sample number, then append order.
    pub measurements: Vec<MeasurementRecord>,
}

/// Storage trait for executions, samples, measurements and export jobs.
///
/// Lookups return `Ok(None)` for missing entities; the services turn that
/// into `NotFound`. Conditional updates return `Ok(false)` when the
/// precondition no longer holds.
pub trait ExecutionStore: Send + Sync {
    /// Create an execution together with all of its samples in one unit.
    fn create_execution(
        &self,
        execution: ExecutionRecord,
        samples: Vec<SampleRecord>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Get an execution by id.
    fn get_execution(&self, id: &str) -> impl Future<Output = Result<Option<ExecutionRecord>>> + Send;

    /// List executions matching `filter`, newest first.
    fn list_executions(
        &self,
        filter: &ExecutionFilter,
        pagination: Pagination,
    ) -> impl Future<Output = Result<Page<ExecutionRecord>>> + Send;

    /// Replace an execution if the stored one still matches `expected`.
    fn update_execution(
        &self,
        expected: Precondition<ExecutionStatus>,
        execution: &ExecutionRecord,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Get a sample by id.
    fn get_sample(&self, id: &str) -> impl Future<Output = Result<Option<SampleRecord>>> + Send;

    /// All samples of an execution ordered by sample number, read as one snapshot.
    fn list_samples(&self, execution_id: &str) -> impl Future<Output = Result<Vec<SampleRecord>>> + Send;

    /// Replace a sample if the stored one still matches `expected`.
    fn update_sample(
        &self,
        expected: Precondition<SampleStatus>,
        sample: &SampleRecord,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Append a ledger row.
    ///
    /// Idempotency keys are scoped to the sample. If the row carries a key
    /// already recorded for its sample, the original row is returned and
    /// nothing is appended. A key reused for a different step or
    /// measurement id is a `Validation` error on `idempotencyKey`.
    fn append_measurement(
        &self,
        measurement: MeasurementRecord,
    ) -> impl Future<Output = Result<MeasurementRecord>> + Send;

    /// Ledger rows of one sample in append order.
    fn list_sample_measurements(
        &self,
        sample_id: &str,
    ) -> impl Future<Output = Result<Vec<MeasurementRecord>>> + Send;

    /// Execution with samples and measurements, read consistently.
    fn snapshot(&self, execution_id: &str) -> impl Future<Output = Result<Option<ExecutionSnapshot>>> + Send;

    /// Persist a new export job.
    fn create_export(&self, export: &ExportRecord) -> impl Future<Output = Result<()>> + Send;

    /// Get an export job by id.
    fn get_export(&self, id: &str) -> impl Future<Output = Result<Option<ExportRecord>>> + Send;

    /// Export jobs of one execution, oldest first.
    fn list_exports(&self, execution_id: &str) -> impl Future<Output = Result<Vec<ExportRecord>>> + Send;

    /// Export jobs that have not reached a terminal state.
    fn list_open_exports(&self) -> impl Future<Output = Result<Vec<ExportRecord>>> + Send;

    /// Replace an export job if the stored one still matches `expected`.
    fn update_export(
        &self,
        expected: Precondition<ExportStatus>,
        export: &ExportRecord,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Ledger rows of a whole execution.
    ///
    /// Default implementation goes through [`ExecutionStore::snapshot`].
    fn list_execution_measurements(
        &self,
        execution_id: &str,
    ) -> impl Future<Output = Result<Option<Vec<MeasurementRecord>>>> + Send {
        async move {
            Ok(self
                .snapshot(execution_id)
                .await?
                .map(|snapshot| snapshot.measurements))
        }
    }
}
