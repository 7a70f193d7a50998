//! Execution lifecycle
//!
//! ```text
//! NOT_STARTED --start--> IN_PROGRESS --pause--> PAUSED
//!                        IN_PROGRESS <--resume-- PAUSED
//! {NOT_STARTED, IN_PROGRESS, PAUSED} --complete--> COMPLETED
//! {NOT_STARTED, IN_PROGRESS, PAUSED} --cancel----> CANCELLED
//! {IN_PROGRESS, PAUSED}              --fail------> FAILED
//! ```
//!
//! Terminal transitions freeze the statistics computed from the samples at
//! that moment. Until then, reads derive them live.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::TrackerConfig;
use crate::error::{require, Entity};
use crate::progress::{self, ProgressReport};
use crate::record::{ExecutionAction, ExecutionRecord, Operator, SampleRecord};
use crate::store::{ExecutionFilter, ExecutionSnapshot, ExecutionStore, Page};
use crate::{Error, Result};

/// One sample to allocate when an execution is created.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleSpec {
    /// Label of the sample.
    pub name: String,
    /// Free-form metadata copied onto the sample.
    pub metadata: Option<serde_json::Value>,
}

impl SampleSpec {
    /// Spec with a name and no metadata.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: None,
        }
    }

    /// Attach metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Everything needed to create an execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateExecutionRequest {
    /// Study the execution belongs to.
    pub study_id: String,
    /// Study display name.
    pub study_name: String,
    /// Protocol followed.
    pub protocol_id: String,
    /// Protocol display name.
    pub protocol_name: String,
    /// Study category.
    pub category: String,
    /// Samples in processing order.
    pub samples: Vec<SampleSpec>,
    /// Environment metadata.
    pub environment: Option<serde_json::Value>,
    /// Test-condition metadata.
    pub test_conditions: Option<serde_json::Value>,
}

impl CreateExecutionRequest {
    /// Request with the required names and no samples yet.
    #[must_use]
    pub fn new(
        study_name: impl Into<String>,
        protocol_name: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            study_name: study_name.into(),
            protocol_name: protocol_name.into(),
            category: category.into(),
            ..Self::default()
        }
    }

    /// Set the study id.
    #[must_use]
    pub fn study_id(mut self, study_id: impl Into<String>) -> Self {
        self.study_id = study_id.into();
        self
    }

    /// Set the protocol id.
    #[must_use]
    pub fn protocol_id(mut self, protocol_id: impl Into<String>) -> Self {
        self.protocol_id = protocol_id.into();
        self
    }

    /// Append a sample.
    #[must_use]
    pub fn sample(mut self, sample: SampleSpec) -> Self {
        self.samples.push(sample);
        self
    }

    /// Append samples by name.
    #[must_use]
    pub fn samples<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.samples.extend(names.into_iter().map(SampleSpec::new));
        self
    }

    /// Attach environment metadata.
    #[must_use]
    pub fn environment(mut self, environment: serde_json::Value) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Attach test-condition metadata.
    #[must_use]
    pub fn test_conditions(mut self, test_conditions: serde_json::Value) -> Self {
        self.test_conditions = Some(test_conditions);
        self
    }

    /// Check required fields in order; the error names the first missing one.
    ///
    /// # Errors
    ///
    /// Returns `Validation`.
    pub fn validate(&self, operator: &Operator) -> Result<()> {
        require("studyName", &self.study_name)?;
        require("protocolName", &self.protocol_name)?;
        require("category", &self.category)?;
        require("operatorId", &operator.id)?;
        if self.samples.is_empty() {
            return Err(Error::invalid("samples", "at least one sample is required"));
        }
        if let Some(pos) = self.samples.iter().position(|s| s.name.trim().is_empty()) {
            return Err(Error::invalid(
                "sampleName",
                format!("sample {} has no name", pos + 1),
            ));
        }
        Ok(())
    }
}

/// Owns the execution state machine.
#[derive(Debug)]
pub struct ExecutionLifecycleManager<R> {
    store: Arc<R>,
    config: Arc<TrackerConfig>,
}

impl<R> Clone for ExecutionLifecycleManager<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<R: ExecutionStore> ExecutionLifecycleManager<R> {
    /// Create a manager over `store`.
    #[must_use]
    pub const fn new(store: Arc<R>, config: Arc<TrackerConfig>) -> Self {
        Self { store, config }
    }

    /// Create an execution and its samples in `NotStarted`.
    ///
    /// Samples are numbered from 1 in submission order.
    ///
    /// # Errors
    ///
    /// Returns `Validation` naming the first missing field, or `Persistence`
    /// if the store rejects the write.
    #[instrument(skip(self, request, operator), fields(operator_id = %operator.id, samples = request.samples.len()))]
    pub async fn create_execution(
        &self,
        request: CreateExecutionRequest,
        operator: Operator,
    ) -> Result<ExecutionRecord> {
        if let Err(e) = request.validate(&operator) {
            warn!(error = %e, "rejected execution");
            return Err(e);
        }

        let total = u32::try_from(request.samples.len())
            .map_err(|_| Error::invalid("samples", "too many samples"))?;
        let mut builder = ExecutionRecord::builder(
            request.study_name,
            request.protocol_name,
            request.category,
            operator,
        )
        .study_id(request.study_id)
        .protocol_id(request.protocol_id)
        .total_steps(total);
        if let Some(environment) = request.environment {
            builder = builder.environment(environment);
        }
        if let Some(conditions) = request.test_conditions {
            builder = builder.test_conditions(conditions);
        }
        let execution = builder.build();

        let samples = (1..)
            .zip(request.samples)
            .map(|(n, spec)| {
                let sample = SampleRecord::new(execution.id(), n, spec.name);
                match spec.metadata {
                    Some(metadata) => sample.with_metadata(metadata),
                    None => sample,
                }
            })
            .collect();

        self.store
            .create_execution(execution.clone(), samples)
            .await?;
        info!(execution_id = execution.id(), total_steps = total, "execution created");
        Ok(execution)
    }

    /// Start a new execution.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless `NotStarted`; `NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn start(&self, execution_id: &str) -> Result<ExecutionRecord> {
        self.transition(execution_id, ExecutionAction::Start, |e, _| e.start(Utc::now()))
            .await
    }

    /// Pause a running execution.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless `InProgress`; `NotFound` for an unknown id.
    #[instrument(skip(self, notes))]
    pub async fn pause(&self, execution_id: &str, notes: Option<String>) -> Result<ExecutionRecord> {
        self.transition(execution_id, ExecutionAction::Pause, |e, _| {
            e.pause(notes.clone(), Utc::now())
        })
        .await
    }

    /// Resume a paused execution.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless `Paused`; `NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn resume(&self, execution_id: &str) -> Result<ExecutionRecord> {
        self.transition(execution_id, ExecutionAction::Resume, |e, _| e.resume(Utc::now()))
            .await
    }

    /// Complete an execution, freezing the final statistics.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` if already terminal; `NotFound` for an unknown id.
    #[instrument(skip(self, summary, recommendations))]
    pub async fn complete(
        &self,
        execution_id: &str,
        summary: Option<String>,
        recommendations: Option<String>,
    ) -> Result<ExecutionRecord> {
        self.transition(execution_id, ExecutionAction::Complete, |e, report| {
            e.complete(report, summary.clone(), recommendations.clone(), Utc::now())
        })
        .await
    }

    /// Cancel an execution that has not finished.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank reason; `InvalidTransition` if already
    /// terminal; `NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn cancel(&self, execution_id: &str, reason: &str) -> Result<ExecutionRecord> {
        self.transition(execution_id, ExecutionAction::Cancel, |e, report| {
            e.cancel(reason, report, Utc::now())
        })
        .await
    }

    /// Abort a started execution because of a failure.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank reason; `InvalidTransition` unless
    /// `InProgress` or `Paused`; `NotFound` for an unknown id.
    #[instrument(skip(self))]
    pub async fn fail(&self, execution_id: &str, reason: &str) -> Result<ExecutionRecord> {
        self.transition(execution_id, ExecutionAction::Fail, |e, report| {
            e.fail(reason, report, Utc::now())
        })
        .await
    }

    /// Get an execution by id.
    ///
    /// Non-terminal executions carry statistics derived from their current
    /// samples; terminal ones carry the frozen values.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn get_execution(&self, execution_id: &str) -> Result<ExecutionRecord> {
        let execution = self.load(execution_id).await?;
        self.with_live_progress(execution).await
    }

    /// List executions matching `filter`, newest first.
    ///
    /// A missing or zero `limit` falls back to the configured default page
    /// size; anything above the configured maximum is clamped.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn list_executions(
        &self,
        filter: &ExecutionFilter,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Page<ExecutionRecord>> {
        let pagination = self.config.paginate(page, limit);
        let page = self.store.list_executions(filter, pagination).await?;

        let mut items = Vec::with_capacity(page.items.len());
        for execution in page.items {
            items.push(self.with_live_progress(execution).await?);
        }
        Ok(Page { items, ..page })
    }

    /// Live progress report computed from the current samples.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn progress(&self, execution_id: &str) -> Result<ProgressReport> {
        self.load(execution_id).await?;
        let samples = self.store.list_samples(execution_id).await?;
        Ok(progress::recompute(&samples))
    }

    /// Execution, samples and measurement ledger read as one snapshot.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn snapshot(&self, execution_id: &str) -> Result<ExecutionSnapshot> {
        let mut snapshot = self
            .store
            .snapshot(execution_id)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Execution, execution_id))?;
        let report = progress::recompute(&snapshot.samples);
        snapshot.execution = snapshot.execution.with_live_progress(&report);
        Ok(snapshot)
    }

    async fn load(&self, execution_id: &str) -> Result<ExecutionRecord> {
        self.store
            .get_execution(execution_id)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Execution, execution_id))
    }

    async fn with_live_progress(&self, execution: ExecutionRecord) -> Result<ExecutionRecord> {
        if execution.status().is_terminal() {
            return Ok(execution);
        }
        let samples = self.store.list_samples(execution.id()).await?;
        Ok(execution.with_live_progress(&progress::recompute(&samples)))
    }

    async fn transition<F>(
        &self,
        execution_id: &str,
        action: ExecutionAction,
        apply: F,
    ) -> Result<ExecutionRecord>
    where
        F: Fn(&mut ExecutionRecord, &ProgressReport) -> Result<()> + Send,
    {
        let current = self.load(execution_id).await?;
        let report = self.report_for(action, execution_id).await?;

        let mut next = current.clone();
        if let Err(e) = apply(&mut next, &report) {
            warn!(execution_id, status = %current.status(), %action, error = %e, "rejected execution transition");
            return Err(e);
        }
        if self
            .store
            .update_execution(current.precondition(), &next)
            .await?
        {
            info!(
                execution_id,
                from = %current.status(),
                to = %next.status(),
                "execution {action}"
            );
            return Ok(next);
        }

        // Lost the race: report what the winner left behind.
        let mut fresh = self.load(execution_id).await?;
        let err = match apply(&mut fresh, &report) {
            Err(e) => e,
            Ok(()) => Error::conflict(Entity::Execution, execution_id),
        };
        warn!(execution_id, %action, error = %err, "concurrent execution transition");
        Err(err)
    }

    async fn report_for(&self, action: ExecutionAction, execution_id: &str) -> Result<ProgressReport> {
        match action {
            ExecutionAction::Complete | ExecutionAction::Cancel | ExecutionAction::Fail => {
                let samples = self.store.list_samples(execution_id).await?;
                Ok(progress::recompute(&samples))
            }
            ExecutionAction::Start | ExecutionAction::Pause | ExecutionAction::Resume => {
                Ok(ProgressReport::default())
            }
        }
    }
}
