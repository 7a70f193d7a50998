//! Measurement collection
//!
//! Validates caller submissions and appends them to the per-sample ledger.
//! The ledger is append-only: there is no update or delete path, and
//! repeating a `(sample, step, measurement)` coordinate adds a new row.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::error::{require, Entity};
use crate::record::{MeasurementRecord, NewMeasurement};
use crate::store::ExecutionStore;
use crate::{Error, Result};

/// Appends measurements to sample ledgers.
#[derive(Debug)]
pub struct MeasurementCollector<R> {
    store: Arc<R>,
}

impl<R> Clone for MeasurementCollector<R> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<R: ExecutionStore> MeasurementCollector<R> {
    /// Create a collector over `store`.
    #[must_use]
    pub const fn new(store: Arc<R>) -> Self {
        Self { store }
    }

    /// Validate and append one measurement.
    ///
    /// The owning execution id is resolved from the sample. A blank
    /// `text_value` is not stored. If the draft carries an idempotency key
    /// already recorded for the same sample and coordinate, the original
    /// row is returned unchanged.
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank coordinate or operator, a missing value,
    ///   or a non-finite number
    /// - `Validation` on `idempotencyKey` if the key was already used on
    ///   this sample for another step or measurement
    /// - `NotFound` if the sample does not exist
    #[instrument(skip(self, draft), fields(sample_id = %draft.sample_id, step_id = %draft.step_id))]
    pub async fn add_measurement(&self, draft: NewMeasurement) -> Result<MeasurementRecord> {
        if let Err(e) = validate(&draft) {
            warn!(error = %e, "rejected measurement");
            return Err(e);
        }

        let sample = self
            .store
            .get_sample(&draft.sample_id)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Sample, &draft.sample_id))?;

        let row = MeasurementRecord::from_draft(draft, sample.execution_id(), Utc::now());
        let stored = self.store.append_measurement(row).await?;
        info!(
            execution_id = stored.execution_id(),
            measurement_id = stored.measurement_id(),
            row_id = stored.id(),
            "measurement recorded"
        );
        Ok(stored)
    }

    /// Ledger rows of one sample in append order.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the sample does not exist.
    pub async fn list_for_sample(&self, sample_id: &str) -> Result<Vec<MeasurementRecord>> {
        if self.store.get_sample(sample_id).await?.is_none() {
            return Err(Error::not_found(Entity::Sample, sample_id));
        }
        self.store.list_sample_measurements(sample_id).await
    }

    /// Ledger rows of a whole execution, grouped by sample number.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the execution does not exist.
    pub async fn list_for_execution(&self, execution_id: &str) -> Result<Vec<MeasurementRecord>> {
        self.store
            .list_execution_measurements(execution_id)
            .await?
            .ok_or_else(|| Error::not_found(Entity::Execution, execution_id))
    }
}

/// Check a draft before it touches the store.
///
/// Fields are checked in submission order so the error names the first
/// offending one.
///
/// # Errors
///
/// Returns `Validation` naming the field.
pub fn validate(draft: &NewMeasurement) -> Result<()> {
    require("sampleId", &draft.sample_id)?;
    require("stepId", &draft.step_id)?;
    require("measurementId", &draft.measurement_id)?;

    let has_text = draft
        .text_value
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    match draft.value {
        Some(v) if !v.is_finite() => {
            return Err(Error::invalid("value", format!("{v} is not a finite number")));
        }
        None if !has_text => {
            return Err(Error::invalid("value", "either value or textValue is required"));
        }
        _ => {}
    }

    require("operator", &draft.operator)?;
    if let Some(key) = &draft.idempotency_key {
        require("idempotencyKey", key)?;
    }
    Ok(())
}

/// Newest row for every `(sample, step, measurement)` coordinate.
///
/// Later `recorded_at` wins; ties go to the row that comes later in `rows`.
#[must_use]
pub fn latest_values(rows: &[MeasurementRecord]) -> BTreeMap<(&str, &str, &str), &MeasurementRecord> {
    let mut latest: BTreeMap<(&str, &str, &str), &MeasurementRecord> = BTreeMap::new();
    for row in rows {
        latest
            .entry(row.coordinate())
            .and_modify(|current| {
                if row.recorded_at() >= current.recorded_at() {
                    *current = row;
                }
            })
            .or_insert(row);
    }
    latest
}
