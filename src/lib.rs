//! # Edith Tracker: Study Execution Tracking
//!
//! Tracks one run of a laboratory study: the execution record, its ordered
//! samples, an append-only measurement ledger per sample, and export jobs
//! derived from the execution.
//!
//! ## Components
//!
//! - [`measurement::MeasurementCollector`]: validates and appends ledger rows
//! - [`sample::SampleTracker`]: per-sample lifecycle
//! - [`progress`]: pure progress and pass/fail reducers
//! - [`lifecycle::ExecutionLifecycleManager`]: execution state machine
//! - [`export::ExportCoordinator`]: export job lifecycle
//!
//! Persistence sits behind [`store::ExecutionStore`]; [`store::MemoryStore`]
//! is the bundled implementation.
//!
//! ## Example
//!
//! ```rust
//! use edith_tracker::lifecycle::CreateExecutionRequest;
//! use edith_tracker::record::{ExecutionStatus, NewMeasurement, Operator, OverallStatus};
//! use edith_tracker::Tracker;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> edith_tracker::Result<()> {
//! let tracker = Tracker::in_memory();
//! let request = CreateExecutionRequest::new("Stability", "ICH Q1A", "stability")
//!     .samples(["Batch 7"]);
//! let execution = tracker
//!     .executions()
//!     .create_execution(request, Operator::new("op-1"))
//!     .await?;
//! tracker.executions().start(execution.id()).await?;
//!
//! let samples = tracker.samples().list_samples(execution.id()).await?;
//! let sample = &samples[0];
//! tracker
//!     .measurements()
//!     .add_measurement(NewMeasurement::new(sample.id(), "step-1", "ph", "op-1").value(7.1))
//!     .await?;
//! tracker.samples().complete(sample.id(), "pass", None).await?;
//!
//! let done = tracker.executions().complete(execution.id(), None, None).await?;
//! assert_eq!(done.status(), ExecutionStatus::Completed);
//! assert_eq!(done.overall_status(), OverallStatus::Passed);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod error;
pub mod export;
pub mod lifecycle;
pub mod logging;
pub mod measurement;
pub mod progress;
pub mod record;
pub mod sample;
pub mod store;
pub mod tracker;

pub use error::{Error, Result};
pub use tracker::{Tracker, TrackerBuilder};
