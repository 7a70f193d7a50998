//! Execution Tracking Records
//!
//! Data structures for one run of a study and everything hanging off it.
//!
//! ## Schema Overview
//!
//! ```text
//! ExecutionRecord (1) ──< SampleRecord (N, numbered 1..N)
//!        │                     └──< MeasurementRecord (N) [append-only ledger]
//!        └──< ExportRecord (N) [by reference, independent lifecycle]
//! ```
//!
//! Each record owns its state machine (see [`transition`]); the services in
//! this crate only read, apply a transition and write back conditionally.
//!
//! ## Usage
//!
//! ```rust
//! use chrono::Utc;
//! use edith_tracker::record::{ExecutionRecord, Operator, SampleQuality, SampleRecord};
//!
//! let mut execution =
//!     ExecutionRecord::builder("Stability", "ICH Q1A", "stability", Operator::new("op-1"))
//!         .total_steps(1)
//!         .build();
//! execution.start(Utc::now())?;
//!
//! let mut sample = SampleRecord::new(execution.id(), 1, "Batch 7");
//! sample.complete(SampleQuality::Pass, None, Utc::now())?;
//! # Ok::<(), edith_tracker::Error>(())
//! ```

mod execution_record;
mod export_record;
mod measurement_record;
mod sample_record;
mod status;
pub mod transition;

pub use execution_record::{ExecutionRecord, ExecutionRecordBuilder, Operator};
pub use export_record::{
    export_filename, ExportOptions, ExportRecord, ExportUpdate, EXPORT_FILENAME_PREFIX,
};
pub use measurement_record::{MeasurementRecord, NewMeasurement};
pub use sample_record::SampleRecord;
pub use status::{
    ExecutionStatus, ExportFormat, ExportStatus, OverallStatus, SampleQuality, SampleStatus,
};
pub use transition::{ExecutionAction, SampleAction};
