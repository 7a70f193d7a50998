//! Progress aggregation over a sample collection
//!
//! Pure reducers: same samples in, same report out, no I/O. Callers are
//! responsible for handing in a consistent snapshot of one execution's
//! samples.

use serde::{Deserialize, Serialize};

use crate::record::{OverallStatus, SampleQuality, SampleRecord, SampleStatus};

/// Execution-level statistics derived from its samples.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ProgressReport {
    /// Number of samples in the execution.
    pub total_samples: u32,
    /// Samples that are completed or skipped.
    pub completed_or_skipped: u32,
    /// `completed_or_skipped / total_samples * 100`, 0 for an empty set.
    pub progress: f64,
    /// `progress` rounded to the nearest integer.
    pub completion_percentage: u8,
    /// Same as `completed_or_skipped`.
    pub current_step: u32,
    /// Completed samples with quality `pass`.
    pub passed_samples: u32,
    /// Completed samples with quality `fail`.
    pub failed_samples: u32,
    /// Verdict over the completed samples.
    pub overall_status: OverallStatus,
}

/// Compute the progress report for a set of samples.
///
/// ```rust
/// use edith_tracker::progress::recompute;
///
/// let report = recompute(&[]);
/// assert_eq!(report.progress, 0.0);
/// assert_eq!(report.current_step, 0);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn recompute(samples: &[SampleRecord]) -> ProgressReport {
    let total = samples.len() as u32;
    let done = count(samples, |s| s.status().counts_as_done());
    let passed = count(samples, |s| is_completed_with(s, SampleQuality::Pass));
    let failed = count(samples, |s| is_completed_with(s, SampleQuality::Fail));

    let progress = if total > 0 {
        f64::from(done) / f64::from(total) * 100.0
    } else {
        0.0
    };

    ProgressReport {
        total_samples: total,
        completed_or_skipped: done,
        progress,
        completion_percentage: progress.round() as u8,
        current_step: done,
        passed_samples: passed,
        failed_samples: failed,
        overall_status: overall_status(samples),
    }
}

/// Pass/fail verdict over the completed samples.
///
/// - no completed sample: `Pending`
/// - every completed sample passed: `Passed`
/// - no completed sample passed: `Failed`
/// - otherwise: `Partial`
#[must_use]
pub fn overall_status(samples: &[SampleRecord]) -> OverallStatus {
    let mut completed = 0usize;
    let mut passed = 0usize;
    for sample in samples.iter().filter(|s| s.status() == SampleStatus::Completed) {
        completed += 1;
        if sample.quality() == Some(SampleQuality::Pass) {
            passed += 1;
        }
    }

    match (completed, passed) {
        (0, _) => OverallStatus::Pending,
        (c, p) if c == p => OverallStatus::Passed,
        (_, 0) => OverallStatus::Failed,
        _ => OverallStatus::Partial,
    }
}

fn is_completed_with(sample: &SampleRecord, quality: SampleQuality) -> bool {
    sample.status() == SampleStatus::Completed && sample.quality() == Some(quality)
}

#[allow(clippy::cast_possible_truncation)]
fn count(samples: &[SampleRecord], pred: impl Fn(&SampleRecord) -> bool) -> u32 {
    samples.iter().filter(|s| pred(s)).count() as u32
}
