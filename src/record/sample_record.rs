//! Sample Record - one specimen processed within an execution

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::execution_record::Operator;
use super::status::{SampleQuality, SampleStatus};
use super::transition::{next_sample_status, SampleAction};
use crate::error::{require, Entity, Error, Result};
use crate::store::Precondition;

/// Sample Record tracks the processing of a single specimen.
///
/// `sample_number` is the 1-based ordinal assigned at creation and never
/// changes. Progress is binary: 0 until the sample reaches a terminal state,
/// 100 afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SampleRecord {
    id: String,
    execution_id: String,
    sample_number: u32,
    name: String,
    metadata: Option<serde_json::Value>,
    status: SampleStatus,
    quality: Option<SampleQuality>,
    progress: u8,
    operator: Option<Operator>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    notes: Option<String>,
    anomalies: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl SampleRecord {
    /// Create a new pending sample.
    ///
    /// # Arguments
    ///
    /// * `execution_id` - ID of the owning execution
    /// * `sample_number` - 1-based ordinal within the execution
    /// * `name` - Label given in the creation request
    #[must_use]
    pub fn new(execution_id: impl Into<String>, sample_number: u32, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            execution_id: execution_id.into(),
            sample_number,
            name: name.into(),
            metadata: None,
            status: SampleStatus::Pending,
            quality: None,
            progress: 0,
            operator: None,
            started_at: None,
            completed_at: None,
            notes: None,
            anomalies: Vec::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }

    /// Attach free-form metadata from the creation request.
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Get the sample ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the owning execution ID.
    #[must_use]
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Get the 1-based ordinal.
    #[must_use]
    pub const fn sample_number(&self) -> u32 {
        self.sample_number
    }

    /// Get the sample name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the sample metadata.
    #[must_use]
    pub const fn metadata(&self) -> Option<&serde_json::Value> {
        self.metadata.as_ref()
    }

    /// Get the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> SampleStatus {
        self.status
    }

    /// Get the quality verdict; only set once completed.
    #[must_use]
    pub const fn quality(&self) -> Option<SampleQuality> {
        self.quality
    }

    /// Get the progress (0 or 100).
    #[must_use]
    pub const fn progress(&self) -> u8 {
        self.progress
    }

    /// Get the operator who started the sample.
    #[must_use]
    pub const fn operator(&self) -> Option<&Operator> {
        self.operator.as_ref()
    }

    /// Get the start timestamp.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the completion timestamp.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Get the notes (completion notes, skip or failure reason).
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Get the recorded anomalies in insertion order.
    #[must_use]
    pub fn anomalies(&self) -> &[String] {
        &self.anomalies
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get the last-modified timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Get the optimistic-concurrency version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// State a conditional write of this record must find in the store.
    #[must_use]
    pub const fn precondition(&self) -> Precondition<SampleStatus> {
        Precondition {
            status: self.status,
            version: self.version,
        }
    }

    /// Pick up the sample, transitioning from `Pending` to `InProgress`.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank operator id and `InvalidTransition`
    /// unless the sample is `Pending`.
    pub fn start(&mut self, operator: Operator, now: DateTime<Utc>) -> Result<()> {
        require("operatorId", &operator.id)?;
        self.transition(SampleAction::Start, now)?;
        self.operator = Some(operator);
        self.started_at = Some(now);
        Ok(())
    }

    /// Complete the sample with a quality verdict.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the sample is already terminal.
    pub fn complete(
        &mut self,
        quality: SampleQuality,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.transition(SampleAction::Complete, now)?;
        self.quality = Some(quality);
        self.finish(notes, now);
        Ok(())
    }

    /// Skip the sample.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank reason and `InvalidTransition` if the
    /// sample is already terminal.
    pub fn skip(&mut self, reason: &str, now: DateTime<Utc>) -> Result<()> {
        require("reason", reason)?;
        self.transition(SampleAction::Skip, now)?;
        self.finish(Some(reason.trim().to_string()), now);
        Ok(())
    }

    /// Mark processing of the sample as failed.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank reason and `InvalidTransition` if the
    /// sample is already terminal.
    pub fn fail(&mut self, reason: &str, now: DateTime<Utc>) -> Result<()> {
        require("reason", reason)?;
        self.transition(SampleAction::Fail, now)?;
        self.finish(Some(reason.trim().to_string()), now);
        Ok(())
    }

    /// Append an anomaly observation. Status is unchanged.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank description.
    pub fn record_anomaly(&mut self, description: &str, now: DateTime<Utc>) -> Result<()> {
        require("anomaly", description)?;
        self.anomalies.push(description.trim().to_string());
        self.updated_at = now;
        self.version += 1;
        Ok(())
    }

    fn finish(&mut self, notes: Option<String>, now: DateTime<Utc>) {
        self.progress = 100;
        self.completed_at = Some(now);
        if notes.is_some() {
            self.notes = notes;
        }
    }

    fn transition(&mut self, action: SampleAction, now: DateTime<Utc>) -> Result<()> {
        let next = next_sample_status(self.status, action).ok_or_else(|| {
            Error::invalid_transition(Entity::Sample, &self.id, self.status, action)
        })?;
        self.status = next;
        self.updated_at = now;
        self.version += 1;
        Ok(())
    }
}
