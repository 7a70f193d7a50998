//! Execution Record - aggregate root for one run of a study

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{ExecutionStatus, OverallStatus};
use super::transition::{next_execution_status, ExecutionAction};
use crate::error::{Entity, Error, Result};
use crate::progress::ProgressReport;
use crate::store::Precondition;

/// Person performing an action. Identity itself is managed elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
    /// Stable identifier of the operator.
    pub id: String,
    /// Display name, if known.
    pub name: Option<String>,
    /// Contact address, if known.
    pub email: Option<String>,
}

impl Operator {
    /// Create an operator reference with only an id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            email: None,
        }
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a contact address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Execution Record represents one tracked run of a study.
///
/// The record owns its state machine: every mutating method checks the
/// transition table, bumps `version` and refreshes `updated_at`. Stores use
/// [`ExecutionRecord::precondition`] to make the write conditional on the
/// state that was read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionRecord {
    id: String,
    study_id: String,
    study_name: String,
    protocol_id: String,
    protocol_name: String,
    category: String,
    operator: Operator,
    status: ExecutionStatus,
    progress: f64,
    current_step: u32,
    total_steps: u32,
    started_at: Option<DateTime<Utc>>,
    paused_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    environment: Option<serde_json::Value>,
    test_conditions: Option<serde_json::Value>,
    notes: Option<String>,
    summary: Option<String>,
    recommendations: Option<String>,
    overall_status: OverallStatus,
    passed_samples: u32,
    failed_samples: u32,
    completion_percentage: u8,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl ExecutionRecord {
    /// Create a builder with the fields every execution requires.
    #[must_use]
    pub fn builder(
        study_name: impl Into<String>,
        protocol_name: impl Into<String>,
        category: impl Into<String>,
        operator: Operator,
    ) -> ExecutionRecordBuilder {
        ExecutionRecordBuilder::new(study_name, protocol_name, category, operator)
    }

    /// Get the execution ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the study ID.
    #[must_use]
    pub fn study_id(&self) -> &str {
        &self.study_id
    }

    /// Get the study name.
    #[must_use]
    pub fn study_name(&self) -> &str {
        &self.study_name
    }

    /// Get the protocol ID.
    #[must_use]
    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    /// Get the protocol name.
    #[must_use]
    pub fn protocol_name(&self) -> &str {
        &self.protocol_name
    }

    /// Get the study category.
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Get the operator who created the execution.
    #[must_use]
    pub const fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Get the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> ExecutionStatus {
        self.status
    }

    /// Get the progress in percent (0-100).
    #[must_use]
    pub const fn progress(&self) -> f64 {
        self.progress
    }

    /// Get the number of samples completed or skipped.
    #[must_use]
    pub const fn current_step(&self) -> u32 {
        self.current_step
    }

    /// Get the number of samples allocated at creation.
    #[must_use]
    pub const fn total_steps(&self) -> u32 {
        self.total_steps
    }

    /// Get the start timestamp.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the pause timestamp; cleared on resume.
    #[must_use]
    pub const fn paused_at(&self) -> Option<DateTime<Utc>> {
        self.paused_at
    }

    /// Get the timestamp of the terminal transition.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Get the environment metadata.
    #[must_use]
    pub const fn environment(&self) -> Option<&serde_json::Value> {
        self.environment.as_ref()
    }

    /// Get the test-condition metadata.
    #[must_use]
    pub const fn test_conditions(&self) -> Option<&serde_json::Value> {
        self.test_conditions.as_ref()
    }

    /// Get the latest pause notes or termination reason.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Get the completion summary.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Get the completion recommendations.
    #[must_use]
    pub fn recommendations(&self) -> Option<&str> {
        self.recommendations.as_deref()
    }

    /// Get the derived pass/fail verdict.
    #[must_use]
    pub const fn overall_status(&self) -> OverallStatus {
        self.overall_status
    }

    /// Get the number of completed samples that passed.
    #[must_use]
    pub const fn passed_samples(&self) -> u32 {
        self.passed_samples
    }

    /// Get the number of completed samples that failed.
    #[must_use]
    pub const fn failed_samples(&self) -> u32 {
        self.failed_samples
    }

    /// Get the rounded progress.
    #[must_use]
    pub const fn completion_percentage(&self) -> u8 {
        self.completion_percentage
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
    pub const fn precondition(&self) -> Precondition<ExecutionStatus> {
        Precondition {
            status: self.status,
            version: self.version,
        }
    }

    /// Start the execution, transitioning from `NotStarted` to `InProgress`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` from any other state.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(ExecutionAction::Start, now)?;
        self.started_at = Some(now);
        self.progress = 0.0;
        self.completion_percentage = 0;
        Ok(())
    }

    /// Pause a running execution.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the execution is `InProgress`.
    pub fn pause(&mut self, notes: Option<String>, now: DateTime<Utc>) -> Result<()> {
        self.transition(ExecutionAction::Pause, now)?;
        self.paused_at = Some(now);
        if notes.is_some() {
            self.notes = notes;
        }
        Ok(())
    }

    /// Resume a paused execution.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless the execution is `Paused`.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<()> {
        self.transition(ExecutionAction::Resume, now)?;
        self.paused_at = None;
        Ok(())
    }

    /// Complete the execution and freeze the final statistics.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if the execution is already terminal.
    pub fn complete(
        &mut self,
        report: &ProgressReport,
        summary: Option<String>,
        recommendations: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.transition(ExecutionAction::Complete, now)?;
        self.freeze(report);
        self.progress = 100.0;
        self.completion_percentage = 100;
        self.summary = summary;
        self.recommendations = recommendations;
        self.completed_at = Some(now);
        self.paused_at = None;
        Ok(())
    }

    /// Cancel the execution, keeping the statistics reached so far.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank reason and `InvalidTransition` if the
    /// execution is already terminal.
    pub fn cancel(&mut self, reason: &str, report: &ProgressReport, now: DateTime<Utc>) -> Result<()> {
        self.terminate(ExecutionAction::Cancel, reason, report, now)
    }

    /// Mark the execution as failed, keeping the statistics reached so far.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a blank reason and `InvalidTransition` unless
    /// the execution is `InProgress` or `Paused`.
    pub fn fail(&mut self, reason: &str, report: &ProgressReport, now: DateTime<Utc>) -> Result<()> {
        self.terminate(ExecutionAction::Fail, reason, report, now)
    }

    /// Copy of this record with derived fields taken from a live report.
    ///
    /// Terminal executions keep their frozen statistics.
    #[must_use]
    pub fn with_live_progress(&self, report: &ProgressReport) -> Self {
        let mut view = self.clone();
        if !self.status.is_terminal() {
            view.freeze(report);
            view.progress = report.progress;
            view.completion_percentage = report.completion_percentage;
        }
        view
    }

    fn terminate(
        &mut self,
        action: ExecutionAction,
        reason: &str,
        report: &ProgressReport,
        now: DateTime<Utc>,
    ) -> Result<()> {
        crate::error::require("reason", reason)?;
        self.transition(action, now)?;
        self.freeze(report);
        self.progress = report.progress;
        self.completion_percentage = report.completion_percentage;
        self.notes = Some(reason.trim().to_string());
        self.completed_at = Some(now);
        self.paused_at = None;
        Ok(())
    }

    fn freeze(&mut self, report: &ProgressReport) {
        self.current_step = report.current_step;
        self.passed_samples = report.passed_samples;
        self.failed_samples = report.failed_samples;
        self.overall_status = report.overall_status;
    }

    fn transition(&mut self, action: ExecutionAction, now: DateTime<Utc>) -> Result<()> {
        let next = next_execution_status(self.status, action).ok_or_else(|| {
            Error::invalid_transition(Entity::Execution, &self.id, self.status, action)
        })?;
        self.status = next;
        self.updated_at = now;
        self.version += 1;
        Ok(())
    }
}

/// Builder for `ExecutionRecord`.
#[derive(Debug)]
pub struct ExecutionRecordBuilder {
    id: String,
    study_id: String,
    study_name: String,
    protocol_id: String,
    protocol_name: String,
    category: String,
    operator: Operator,
    total_steps: u32,
    environment: Option<serde_json::Value>,
    test_conditions: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl ExecutionRecordBuilder {
    /// Create a new builder with required fields and a fresh id.
    #[must_use]
    pub fn new(
        study_name: impl Into<String>,
        protocol_name: impl Into<String>,
        category: impl Into<String>,
        operator: Operator,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            study_id: String::new(),
            study_name: study_name.into(),
            protocol_id: String::new(),
            protocol_name: protocol_name.into(),
            category: category.into(),
            operator,
            total_steps: 0,
            environment: None,
            test_conditions: None,
            created_at: Utc::now(),
        }
    }

    /// Use a specific execution id.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
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

    /// Set the number of samples; fixed for the life of the execution.
    #[must_use]
    pub const fn total_steps(mut self, total_steps: u32) -> Self {
        self.total_steps = total_steps;
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

    /// Set a custom creation timestamp.
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the `ExecutionRecord` in `NotStarted` status.
    #[must_use]
    pub fn build(self) -> ExecutionRecord {
        ExecutionRecord {
            id: self.id,
            study_id: self.study_id,
            study_name: self.study_name,
            protocol_id: self.protocol_id,
            protocol_name: self.protocol_name,
            category: self.category,
            operator: self.operator,
            status: ExecutionStatus::NotStarted,
            progress: 0.0,
            current_step: 0,
            total_steps: self.total_steps,
            started_at: None,
            paused_at: None,
            completed_at: None,
            environment: self.environment,
            test_conditions: self.test_conditions,
            notes: None,
            summary: None,
            recommendations: None,
            overall_status: OverallStatus::Pending,
            passed_samples: 0,
            failed_samples: 0,
            completion_percentage: 0,
            created_at: self.created_at,
            updated_at: self.created_at,
            version: 0,
        }
    }
}
