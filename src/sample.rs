//! Per-sample lifecycle
//!
//! Samples move independently of each other. Every mutation is a read,
//! a transition on the record, and a write conditioned on what was read.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::error::Entity;
use crate::record::{Operator, SampleQuality, SampleRecord};
use crate::store::ExecutionStore;
use crate::{Error, Result};

/// Drives samples through `Pending -> InProgress -> {Completed, Skipped, Failed}`.
///
/// Mutations are rejected once the owning execution is terminal. The
/// execution check and the sample write are separate store calls, so a
/// write racing `complete`, `cancel` or `fail` on the execution can still
/// land after the statistics were frozen. The sample row then shows the
/// new state while the terminal execution keeps its frozen counters.
#[derive(Debug)]
pub struct SampleTracker<R> {
    store: Arc<R>,
}

impl<R> Clone for SampleTracker<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<R: ExecutionStore> SampleTracker<R> {
    /// Create a tracker over `store`.
    #[must_use]
    pub const fn new(store: Arc<R>) -> Self {
        Self { store }
    }

    /// Pick up a pending sample.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank operator id
    /// - `InvalidTransition` unless the sample is `Pending` and its
    ///   execution is still open
    /// - `NotFound` if the sample does not exist
    #[instrument(skip(self, operator), fields(operator_id = %operator.id))]
    pub async fn start(&self, sample_id: &str, operator: Operator) -> Result<SampleRecord> {
        let sample = self
            .mutate(sample_id, "start", |s| s.start(operator.clone(), Utc::now()))
            .await?;
        info!(execution_id = sample.execution_id(), "sample started");
        Ok(sample)
    }

    /// Complete a sample with a quality verdict (`pass`, `fail` or `warning`).
    ///
    /// # Errors
    ///
    /// - `Validation` if `quality` is blank or unknown
    /// - `InvalidTransition` if the sample is already terminal or its
    ///   execution is closed
    /// - `NotFound` if the sample does not exist
    #[instrument(skip(self, notes))]
    pub async fn complete(
        &self,
        sample_id: &str,
        quality: &str,
        notes: Option<String>,
    ) -> Result<SampleRecord> {
        let quality: SampleQuality = quality.parse().inspect_err(|e| {
            warn!(error = %e, "rejected sample completion");
        })?;
        let sample = self
            .mutate(sample_id, "complete", |s| {
                s.complete(quality, notes.clone(), Utc::now())
            })
            .await?;
        info!(execution_id = sample.execution_id(), %quality, "sample completed");
        Ok(sample)
    }

    /// Skip a sample, recording why.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank reason
    /// - `InvalidTransition` if the sample is already terminal or its
    ///   execution is closed
    /// - `NotFound` if the sample does not exist
    #[instrument(skip(self))]
    pub async fn skip(&self, sample_id: &str, reason: &str) -> Result<SampleRecord> {
        let sample = self
            .mutate(sample_id, "skip", |s| s.skip(reason, Utc::now()))
            .await?;
        info!(execution_id = sample.execution_id(), "sample skipped");
        Ok(sample)
    }

    /// Mark processing of a sample as failed.
    ///
    /// # Errors
    ///
    /// Same as [`SampleTracker::skip`].
    #[instrument(skip(self))]
    pub async fn fail(&self, sample_id: &str, reason: &str) -> Result<SampleRecord> {
        let sample = self
            .mutate(sample_id, "fail", |s| s.fail(reason, Utc::now()))
            .await?;
        info!(execution_id = sample.execution_id(), "sample failed");
        Ok(sample)
    }

    /// Append an anomaly observation without changing the sample status.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank description
    /// - `InvalidTransition` if the execution is closed
    /// - `NotFound` if the sample does not exist
    #[instrument(skip(self))]
    pub async fn record_anomaly(&self, sample_id: &str, description: &str) -> Result<SampleRecord> {
        let sample = self
            .mutate(sample_id, "record anomaly on", |s| {
                s.record_anomaly(description, Utc::now())
            })
            .await?;
        info!(
            execution_id = sample.execution_id(),
            anomalies = sample.anomalies().len(),
            "anomaly recorded"
        );
        Ok(sample)
    }

    /// Get a sample by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the sample does not exist.
    pub async fn get_sample(&self, sample_id: &str) -> Result<SampleRecord> {
        self.store
            .get_sample(sample_id)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Sample, sample_id))
    }

    /// Samples of an execution ordered by sample number.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the execution does not exist.
    pub async fn list_samples(&self, execution_id: &str) -> Result<Vec<SampleRecord>> {
        if self.store.get_execution(execution_id).await?.is_none() {
            return Err(Error::not_found(Entity::Execution, execution_id));
        }
        self.store.list_samples(execution_id).await
    }

    async fn mutate<F>(&self, sample_id: &str, action: &'static str, apply: F) -> Result<SampleRecord>
    where
        F: Fn(&mut SampleRecord) -> Result<()> + Send,
    {
        let current = self.get_sample(sample_id).await?;
        self.ensure_execution_open(&current, action).await?;

        let mut next = current.clone();
        if let Err(e) = apply(&mut next) {
            warn!(sample_id, status = %current.status(), error = %e, "rejected sample {action}");
            return Err(e);
        }
        if self.store.update_sample(current.precondition(), &next).await? {
            return Ok(next);
        }

        // Lost the race: report what the winner left behind.
        let mut fresh = self.get_sample(sample_id).await?;
        let err = match apply(&mut fresh) {
            Err(e) => e,
            Ok(()) => Error::conflict(Entity::Sample, sample_id),
        };
        warn!(sample_id, error = %err, "concurrent sample {action}");
        Err(err)
    }

    async fn ensure_execution_open(&self, sample: &SampleRecord, action: &str) -> Result<()> {
        let execution = self
            .store
            .get_execution(sample.execution_id())
            .await?
            .ok_or_else(|| Error::not_found(Entity::Execution, sample.execution_id()))?;
        if execution.status().is_terminal() {
            warn!(
                sample_id = sample.id(),
                execution_status = %execution.status(),
                "sample {action} on closed execution"
            );
            return Err(Error::invalid_transition(
                Entity::Sample,
                sample.id(),
                format!("{} of {} execution", sample.status(), execution.status()),
                action,
            ));
        }
        Ok(())
    }
}
