//! Measurement Record - immutable ledger row for one data point

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Measurement Record represents a single data point recorded against a
/// sample at a protocol step.
///
/// Rows are write-once: there is no setter and no update path. Repeated
/// recordings of the same `(sample_id, step_id, measurement_id)` coordinate
/// are separate rows ordered by `recorded_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeasurementRecord {
    id: String,
    execution_id: String,
    sample_id: String,
    step_id: String,
    measurement_id: String,
    value: Option<f64>,
    text_value: Option<String>,
    unit: Option<String>,
    conditions: Option<serde_json::Value>,
    raw_data: Option<serde_json::Value>,
    calculated_data: Option<serde_json::Value>,
    operator: String,
    equipment: Option<String>,
    method: Option<String>,
    notes: Option<String>,
    idempotency_key: Option<String>,
    recorded_at: DateTime<Utc>,
}

impl MeasurementRecord {
    /// Materialize a validated draft into a ledger row.
    pub(crate) fn from_draft(
        draft: NewMeasurement,
        execution_id: impl Into<String>,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            execution_id: execution_id.into(),
            sample_id: draft.sample_id,
            step_id: draft.step_id,
            measurement_id: draft.measurement_id,
            value: draft.value,
            text_value: draft.text_value.filter(|t| !t.trim().is_empty()),
            unit: draft.unit,
            conditions: draft.conditions,
            raw_data: draft.raw_data,
            calculated_data: draft.calculated_data,
            operator: draft.operator,
            equipment: draft.equipment,
            method: draft.method,
            notes: draft.notes,
            idempotency_key: draft.idempotency_key,
            recorded_at,
        }
    }

    /// Get the row ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the execution ID (denormalized from the sample).
    #[must_use]
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Get the sample ID.
    #[must_use]
    pub fn sample_id(&self) -> &str {
        &self.sample_id
    }

    /// Get the protocol step ID.
    #[must_use]
    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    /// Get the protocol measurement-point ID.
    #[must_use]
    pub fn measurement_id(&self) -> &str {
        &self.measurement_id
    }

    /// Get the numeric value.
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        self.value
    }

    /// Get the textual value.
    #[must_use]
    pub fn text_value(&self) -> Option<&str> {
        self.text_value.as_deref()
    }

    /// Get the unit.
    #[must_use]
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Get the recording conditions.
    #[must_use]
    pub const fn conditions(&self) -> Option<&serde_json::Value> {
        self.conditions.as_ref()
    }

    /// Get the raw instrument data.
    #[must_use]
    pub const fn raw_data(&self) -> Option<&serde_json::Value> {
        self.raw_data.as_ref()
    }

    /// Get the derived data.
    #[must_use]
    pub const fn calculated_data(&self) -> Option<&serde_json::Value> {
        self.calculated_data.as_ref()
    }

    /// Get the operator id.
    #[must_use]
    pub fn operator(&self) -> &str {
        &self.operator
    }

    /// Get the equipment used.
    #[must_use]
    pub fn equipment(&self) -> Option<&str> {
        self.equipment.as_deref()
    }

    /// Get the method used.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    /// Get the notes.
    #[must_use]
    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Get the caller-supplied idempotency key.
    #[must_use]
    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }

    /// Get the append timestamp.
    #[must_use]
    pub const fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    /// `(sample_id, step_id, measurement_id)` coordinate of this row.
    #[must_use]
    pub fn coordinate(&self) -> (&str, &str, &str) {
        (&self.sample_id, &self.step_id, &self.measurement_id)
    }
}

/// A measurement as submitted by a caller, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewMeasurement {
    /// Sample the value was taken from.
    pub sample_id: String,
    /// Protocol step.
    pub step_id: String,
    /// Protocol measurement point.
    pub measurement_id: String,
    /// Numeric value.
    pub value: Option<f64>,
    /// Textual value.
    pub text_value: Option<String>,
    /// Unit of `value`.
    pub unit: Option<String>,
    /// Operator id.
    pub operator: String,
    /// Recording conditions.
    pub conditions: Option<serde_json::Value>,
    /// Raw instrument data.
    pub raw_data: Option<serde_json::Value>,
    /// Derived data.
    pub calculated_data: Option<serde_json::Value>,
    /// Equipment used.
    pub equipment: Option<String>,
    /// Method used.
    pub method: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Deduplicates retried submissions when set.
    pub idempotency_key: Option<String>,
}

impl NewMeasurement {
    /// Create a draft with the required coordinates and operator.
    #[must_use]
    pub fn new(
        sample_id: impl Into<String>,
        step_id: impl Into<String>,
        measurement_id: impl Into<String>,
        operator: impl Into<String>,
    ) -> Self {
        Self {
            sample_id: sample_id.into(),
            step_id: step_id.into(),
            measurement_id: measurement_id.into(),
            operator: operator.into(),
            ..Self::default()
        }
    }

    /// Set the numeric value.
    #[must_use]
    pub const fn value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    /// Set the textual value.
    #[must_use]
    pub fn text_value(mut self, text: impl Into<String>) -> Self {
        self.text_value = Some(text.into());
        self
    }

    /// Set the unit.
    #[must_use]
    pub fn unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Set the recording conditions.
    #[must_use]
    pub fn conditions(mut self, conditions: serde_json::Value) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Set the raw instrument data.
    #[must_use]
    pub fn raw_data(mut self, raw_data: serde_json::Value) -> Self {
        self.raw_data = Some(raw_data);
        self
    }

    /// Set the derived data.
    #[must_use]
    pub fn calculated_data(mut self, calculated_data: serde_json::Value) -> Self {
        self.calculated_data = Some(calculated_data);
        self
    }

    /// Set the equipment.
    #[must_use]
    pub fn equipment(mut self, equipment: impl Into<String>) -> Self {
        self.equipment = Some(equipment.into());
        self
    }

    /// Set the method.
    #[must_use]
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the notes.
    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Set an idempotency key.
    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_draft_copies_payload() {
        let draft = NewMeasurement::new("s-1", "step-1", "ph", "op-1")
            .value(7.2)
            .unit("pH")
            .equipment("meter-3");
        let now = Utc::now();
        let row = MeasurementRecord::from_draft(draft, "exec-1", now);

        assert_eq!(row.execution_id(), "exec-1");
        assert_eq!(row.coordinate(), ("s-1", "step-1", "ph"));
        assert_eq!(row.value(), Some(7.2));
        assert_eq!(row.unit(), Some("pH"));
        assert_eq!(row.equipment(), Some("meter-3"));
        assert_eq!(row.recorded_at(), now);
    }

    #[test]
    fn test_blank_text_dropped_from_row() {
        let draft = NewMeasurement::new("s-1", "step-1", "ph", "op-1")
            .value(7.2)
            .text_value("  ");
        let row = MeasurementRecord::from_draft(draft, "exec-1", Utc::now());
        assert_eq!(row.value(), Some(7.2));
        assert!(row.text_value().is_none());
    }

    #[test]
    fn test_draft_deserializes_with_defaults() {
        let draft: NewMeasurement =
            serde_json::from_str(r#"{"sample_id":"s","text_value":"clear"}"#).unwrap();
        assert_eq!(draft.sample_id, "s");
        assert_eq!(draft.text_value.as_deref(), Some("clear"));
        assert!(draft.value.is_none());
        assert!(draft.step_id.is_empty());
    }
}
