//! Export job coordination
//!
//! The tracker only owns the job lifecycle. Rendering happens elsewhere: a
//! renderer reads [`ExportCoordinator::source`] and reports back through
//! [`ExportCoordinator::update_export_status`].
//!
//! ```text
//! PENDING --> IN_PROGRESS --> COMPLETED
//!    |             |      \-> FAILED
//!    \-> FAILED    |
//!  (any non-terminal, once past expires_at) --> EXPIRED
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::config::TrackerConfig;
use crate::error::{require, Entity};
use crate::progress;
use crate::record::{ExportFormat, ExportOptions, ExportRecord, ExportUpdate};
use crate::store::{ExecutionSnapshot, ExecutionStore};
use crate::{Error, Result};

/// A caller's request to materialize an execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportRequest {
    /// Execution to export.
    pub execution_id: String,
    /// `PDF`, `EXCEL`, `CSV` or `JSON`, case-insensitive.
    pub format: String,
    /// Report type, e.g. `EXECUTION_REPORT`.
    pub export_type: String,
    /// Renderer options.
    pub options: ExportOptions,
    /// Requesting operator id.
    pub requested_by: String,
}

impl ExportRequest {
    /// Request with default options.
    #[must_use]
    pub fn new(
        execution_id: impl Into<String>,
        format: impl Into<String>,
        export_type: impl Into<String>,
        requested_by: impl Into<String>,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            format: format.into(),
            export_type: export_type.into(),
            options: ExportOptions::default(),
            requested_by: requested_by.into(),
        }
    }

    /// Replace the renderer options.
    #[must_use]
    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }
}

/// Manages export jobs independently of the execution lifecycle.
#[derive(Debug)]
pub struct ExportCoordinator<R> {
    store: Arc<R>,
    config: Arc<TrackerConfig>,
}

impl<R> Clone for ExportCoordinator<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: Arc::clone(&self.config),
        }
    }
}

impl<R: ExecutionStore> ExportCoordinator<R> {
    /// Create a coordinator over `store`.
    #[must_use]
    pub const fn new(store: Arc<R>, config: Arc<TrackerConfig>) -> Self {
        Self { store, config }
    }

    /// Open a pending export job.
    ///
    /// Any number of jobs may exist per execution, in any execution state.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank or unknown format, a blank type or requester
    /// - `NotFound` if the execution does not exist
    #[instrument(skip(self, request), fields(execution_id = %request.execution_id, format = %request.format))]
    pub async fn request_export(&self, request: ExportRequest) -> Result<ExportRecord> {
        let format = match validate(&request) {
            Ok(format) => format,
            Err(e) => {
                warn!(error = %e, "rejected export request");
                return Err(e);
            }
        };

        if self.store.get_execution(&request.execution_id).await?.is_none() {
            return Err(Error::not_found(Entity::Execution, request.execution_id));
        }

        let export = ExportRecord::new(
            request.execution_id,
            format,
            request.export_type.trim(),
            request.options,
            request.requested_by,
            Utc::now(),
            self.config.export_ttl(),
        );
        self.store.create_export(&export).await?;
        info!(
            export_id = export.id(),
            filename = export.filename(),
            expires_at = %export.expires_at(),
            "export requested"
        );
        Ok(export)
    }

    /// Apply a renderer status report.
    ///
    /// # Errors
    ///
    /// - `Validation` for progress above 100
    /// - `InvalidTransition` for moves outside the export state machine
    /// - `NotFound` for an unknown id
    /// - `Conflict` if another report landed first and this one is still legal
    #[instrument(skip(self, update), fields(status = %update.status))]
    pub async fn update_export_status(
        &self,
        export_id: &str,
        update: ExportUpdate,
    ) -> Result<ExportRecord> {
        let current = self.get_export(export_id).await?;
        let now = Utc::now();

        let mut next = current.clone();
        if let Err(e) = next.apply(&update, now) {
            warn!(export_id, from = %current.status(), error = %e, "rejected export update");
            return Err(e);
        }
        if self.store.update_export(current.precondition(), &next).await? {
            info!(
                export_id,
                from = %current.status(),
                to = %next.status(),
                progress = next.progress(),
                "export updated"
            );
            return Ok(next);
        }

        let mut fresh = self.get_export(export_id).await?;
        let err = match fresh.apply(&update, now) {
            Err(e) => e,
            Ok(()) => Error::conflict(Entity::Export, export_id),
        };
        warn!(export_id, error = %err, "concurrent export update");
        Err(err)
    }

    /// Mark every unfinished job past its deadline as expired.
    ///
    /// Jobs are only marked; nothing is aborted. Returns the number of jobs
    /// expired by this sweep.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    #[instrument(skip(self))]
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<usize> {
        let mut expired = 0;
        for export in self.store.list_open_exports().await? {
            let mut next = export.clone();
            if !next.expire(now) {
                continue;
            }
            if self.store.update_export(export.precondition(), &next).await? {
                info!(export_id = export.id(), from = %export.status(), "export expired");
                expired += 1;
            } else {
                debug!(export_id = export.id(), "export changed during sweep");
            }
        }
        Ok(expired)
    }

    /// Get an export job by id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown id.
    pub async fn get_export(&self, export_id: &str) -> Result<ExportRecord> {
        self.store
            .get_export(export_id)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Export, export_id))
    }

    /// Export jobs of an execution, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the execution does not exist.
    pub async fn list_exports(&self, execution_id: &str) -> Result<Vec<ExportRecord>> {
        if self.store.get_execution(execution_id).await?.is_none() {
            return Err(Error::not_found(Entity::Execution, execution_id));
        }
        self.store.list_exports(execution_id).await
    }

    /// Data the renderer reads for a job: the execution as it is now.
    ///
    /// Jobs do not pin a version of the execution; a renderer that starts
    /// late sees later changes.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown job or a vanished execution.
    pub async fn source(&self, export_id: &str) -> Result<ExecutionSnapshot> {
        let export = self.get_export(export_id).await?;
        let mut snapshot = self
            .store
            .snapshot(export.execution_id())
            .await?
            .ok_or_else(|| Error::not_found(Entity::Execution, export.execution_id()))?;

        let report = progress::recompute(&snapshot.samples);
        snapshot.execution = snapshot.execution.with_live_progress(&report);

        let numbers = &export.options().sample_numbers;
        if !numbers.is_empty() {
            snapshot.samples.retain(|s| numbers.contains(&s.sample_number()));
            let kept: Vec<&str> = snapshot.samples.iter().map(|s| s.id()).collect();
            snapshot
                .measurements
                .retain(|m| kept.contains(&m.sample_id()));
        }
        if !export.options().include_measurements {
            snapshot.measurements.clear();
        }
        Ok(snapshot)
    }
}

fn validate(request: &ExportRequest) -> Result<ExportFormat> {
    require("executionId", &request.execution_id)?;
    let format = request.format.parse()?;
    require("type", &request.export_type)?;
    require("requestedBy", &request.requested_by)?;
    Ok(format)
}
