//! Export Record - job lifecycle for a report derived from an execution

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::status::{ExportFormat, ExportStatus};
use super::transition::can_transition_export;
use crate::error::{Entity, Error, Result};
use crate::store::Precondition;

/// Prefix shared by every generated export file name.
pub const EXPORT_FILENAME_PREFIX: &str = "edith";

/// Derive the download file name for an export.
///
/// `edith-<type-in-kebab-case>-<yyyy-mm-dd>.<format-lowercase>`, where the
/// type has underscores replaced by hyphens and is lowercased.
///
/// ```rust
/// use chrono::NaiveDate;
/// use edith_tracker::record::{export_filename, ExportFormat};
///
/// let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
/// assert_eq!(
///     export_filename("EXECUTION_REPORT", ExportFormat::Pdf, date),
///     "edith-execution-report-2024-03-09.pdf"
/// );
/// ```
#[must_use]
pub fn export_filename(export_type: &str, format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "{EXPORT_FILENAME_PREFIX}-{}-{}.{}",
        export_type.replace('_', "-").to_lowercase(),
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Rendering options passed through to the renderer untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct ExportOptions {
    /// Include the measurement ledger.
    pub include_measurements: bool,
    /// Include raw instrument payloads.
    pub include_raw_data: bool,
    /// Include sample anomalies.
    pub include_anomalies: bool,
    /// Include charts (renderer-dependent).
    pub include_charts: bool,
    /// Restrict the report to these sample numbers; empty means all.
    pub sample_numbers: Vec<u32>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_measurements: true,
            include_raw_data: false,
            include_anomalies: true,
            include_charts: false,
            sample_numbers: Vec::new(),
        }
    }
}

/// Status report from the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportUpdate {
    /// Target status.
    pub status: ExportStatus,
    /// Rendering progress in percent.
    pub progress: Option<u8>,
    /// Errors to append to the job.
    #[serde(default)]
    pub errors: Vec<String>,
    /// Size of the produced file in bytes.
    pub size: Option<u64>,
}

impl ExportUpdate {
    /// Update moving the job to `status` with no other changes.
    #[must_use]
    pub const fn status(status: ExportStatus) -> Self {
        Self {
            status,
            progress: None,
            errors: Vec::new(),
            size: None,
        }
    }

    /// Set the rendering progress.
    #[must_use]
    pub const fn with_progress(mut self, progress: u8) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Append an error message.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.errors.push(error.into());
        self
    }

    /// Set the produced file size.
    #[must_use]
    pub const fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }
}

/// Export Record represents one requested materialization of an execution.
///
/// The job references its execution by id only; it neither locks nor
/// follows later changes to the execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportRecord {
    id: String,
    execution_id: String,
    format: ExportFormat,
    export_type: String,
    options: ExportOptions,
    status: ExportStatus,
    progress: u8,
    requested_by: String,
    requested_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    expires_at: DateTime<Utc>,
    filename: String,
    size: Option<u64>,
    errors: Vec<String>,
    version: u64,
}

impl ExportRecord {
    /// Create a pending export job.
    ///
    /// # Arguments
    ///
    /// * `execution_id` - Execution the report is derived from
    /// * `format` - Output format
    /// * `export_type` - Report type, e.g. `EXECUTION_REPORT`
    /// * `options` - Renderer options
    /// * `requested_by` - Requesting operator id
    /// * `requested_at` - Request time; also fixes the file name date
    /// * `ttl` - Time until the job expires if not completed
    #[must_use]
    pub fn new(
        execution_id: impl Into<String>,
        format: ExportFormat,
        export_type: impl Into<String>,
        options: ExportOptions,
        requested_by: impl Into<String>,
        requested_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        let export_type = export_type.into();
        let filename = export_filename(&export_type, format, requested_at.date_naive());
        Self {
            id: Uuid::new_v4().to_string(),
            execution_id: execution_id.into(),
            format,
            export_type,
            options,
            status: ExportStatus::Pending,
            progress: 0,
            requested_by: requested_by.into(),
            requested_at,
            started_at: None,
            completed_at: None,
            expires_at: requested_at + ttl,
            filename,
            size: None,
            errors: Vec::new(),
            version: 0,
        }
    }

    /// Get the export ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the source execution ID.
    #[must_use]
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Get the output format.
    #[must_use]
    pub const fn format(&self) -> ExportFormat {
        self.format
    }

    /// Get the report type.
    #[must_use]
    pub fn export_type(&self) -> &str {
        &self.export_type
    }

    /// Get the renderer options.
    #[must_use]
    pub const fn options(&self) -> &ExportOptions {
        &self.options
    }

    /// Get the job status.
    #[must_use]
    pub const fn status(&self) -> ExportStatus {
        self.status
    }

    /// Get the rendering progress in percent.
    #[must_use]
    pub const fn progress(&self) -> u8 {
        self.progress
    }

    /// Get the requesting operator id.
    #[must_use]
    pub fn requested_by(&self) -> &str {
        &self.requested_by
    }

    /// Get the request timestamp.
    #[must_use]
    pub const fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }

    /// Get the timestamp rendering started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// Get the timestamp the job reached a terminal state.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Get the deadline.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Get the derived file name.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Get the produced file size.
    #[must_use]
    pub const fn size(&self) -> Option<u64> {
        self.size
    }

    /// Get the accumulated errors.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Get the optimistic-concurrency version.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// State a conditional write of this record must find in the store.
    #[must_use]
    pub const fn precondition(&self) -> Precondition<ExportStatus> {
        Precondition {
            status: self.status,
            version: self.version,
        }
    }

    /// Returns `true` if the job is unfinished and past its deadline.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.status.is_terminal() && now >= self.expires_at
    }

    /// Apply a status report from the renderer.
    ///
    /// Progress never moves backwards: a report below the current value is
    /// accepted but leaves `progress` at its maximum.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for progress above 100 and `InvalidTransition`
    /// for moves outside the export state machine, including expiry before
    /// the deadline.
    pub fn apply(&mut self, update: &ExportUpdate, now: DateTime<Utc>) -> Result<()> {
        if let Some(progress) = update.progress {
            if progress > 100 {
                return Err(Error::invalid("progress", "must be between 0 and 100"));
            }
        }
        let target = update.status;
        if !can_transition_export(self.status, target)
            || (target == ExportStatus::Expired && !self.is_overdue(now))
        {
            return Err(Error::invalid_transition(
                Entity::Export,
                &self.id,
                self.status,
                target,
            ));
        }

        if target == ExportStatus::InProgress && self.started_at.is_none() {
            self.started_at = Some(now);
        }
        if let Some(progress) = update.progress {
            self.progress = self.progress.max(progress);
        }
        if target == ExportStatus::Completed {
            self.progress = 100;
            self.size = update.size.or(self.size);
        }
        if target.is_terminal() {
            self.completed_at = Some(now);
        }
        self.errors.extend(update.errors.iter().cloned());
        self.status = target;
        self.version += 1;
        Ok(())
    }

    /// Expire the job if it is unfinished and past its deadline.
    ///
    /// Returns `true` if the job was expired.
    pub fn expire(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_overdue(now) {
            return false;
        }
        let from = self.status;
        self.errors
            .push(format!("expired in state {from} before completion"));
        self.status = ExportStatus::Expired;
        self.completed_at = Some(now);
        self.version += 1;
        true
    }
}
