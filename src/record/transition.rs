//! State machine transition tables for executions, samples and export jobs.

use std::fmt;

use super::status::{ExecutionStatus, ExportStatus, SampleStatus};

/// Operation requested on an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutionAction {
    /// Begin work.
    Start,
    /// Halt temporarily.
    Pause,
    /// Continue after a pause.
    Resume,
    /// Finish and freeze statistics.
    Complete,
    /// Abandon.
    Cancel,
    /// Abort because of a failure.
    Fail,
}

impl fmt::Display for ExecutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Pause => write!(f, "pause"),
            Self::Resume => write!(f, "resume"),
            Self::Complete => write!(f, "complete"),
            Self::Cancel => write!(f, "cancel"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Operation requested on a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleAction {
    /// Pick up the sample.
    Start,
    /// Record a quality verdict.
    Complete,
    /// Skip processing.
    Skip,
    /// Mark processing as failed.
    Fail,
}

impl fmt::Display for SampleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Complete => write!(f, "complete"),
            Self::Skip => write!(f, "skip"),
            Self::Fail => write!(f, "fail"),
        }
    }
}

/// Returns the status an execution moves to, or `None` if `action` is illegal from `from`.
#[must_use]
pub const fn next_execution_status(
    from: ExecutionStatus,
    action: ExecutionAction,
) -> Option<ExecutionStatus> {
    use ExecutionAction as A;
    use ExecutionStatus as S;

    match (from, action) {
        (S::NotStarted, A::Start) | (S::Paused, A::Resume) => Some(S::InProgress),
        (S::InProgress, A::Pause) => Some(S::Paused),
        (S::NotStarted | S::InProgress | S::Paused, A::Complete) => Some(S::Completed),
        (S::NotStarted | S::InProgress | S::Paused, A::Cancel) => Some(S::Cancelled),
        (S::InProgress | S::Paused, A::Fail) => Some(S::Failed),
        _ => None,
    }
}

/// Returns the status a sample moves to, or `None` if `action` is illegal from `from`.
///
/// Completion is accepted from `Pending` as well as `InProgress`: a sample may
/// be completed directly, but never twice.
#[must_use]
pub const fn next_sample_status(from: SampleStatus, action: SampleAction) -> Option<SampleStatus> {
    use SampleAction as A;
    use SampleStatus as S;

    match (from, action) {
        (S::Pending, A::Start) => Some(S::InProgress),
        (S::Pending | S::InProgress, A::Complete) => Some(S::Completed),
        (S::Pending | S::InProgress, A::Skip) => Some(S::Skipped),
        (S::Pending | S::InProgress, A::Fail) => Some(S::Failed),
        _ => None,
    }
}

/// Returns `true` if an export job may move from `from` to `to`.
///
/// `InProgress -> InProgress` is a progress update. Expiry is additionally
/// gated on the job's deadline by the caller.
#[must_use]
pub const fn can_transition_export(from: ExportStatus, to: ExportStatus) -> bool {
    matches!(
        (from, to),
        (ExportStatus::Pending, ExportStatus::InProgress)
            | (ExportStatus::Pending, ExportStatus::Failed)
            | (ExportStatus::Pending, ExportStatus::Expired)
            | (ExportStatus::InProgress, ExportStatus::InProgress)
            | (ExportStatus::InProgress, ExportStatus::Completed)
            | (ExportStatus::InProgress, ExportStatus::Failed)
            | (ExportStatus::InProgress, ExportStatus::Expired)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_execution_transitions() {
        use ExecutionAction as A;
        use ExecutionStatus as S;

        assert_eq!(next_execution_status(S::NotStarted, A::Start), Some(S::InProgress));
        assert_eq!(next_execution_status(S::InProgress, A::Pause), Some(S::Paused));
        assert_eq!(next_execution_status(S::Paused, A::Resume), Some(S::InProgress));
        assert_eq!(next_execution_status(S::NotStarted, A::Complete), Some(S::Completed));
        assert_eq!(next_execution_status(S::Paused, A::Complete), Some(S::Completed));
        assert_eq!(next_execution_status(S::Paused, A::Cancel), Some(S::Cancelled));
        assert_eq!(next_execution_status(S::InProgress, A::Fail), Some(S::Failed));
    }

    #[test]
    fn invalid_execution_transitions() {
        use ExecutionAction as A;
        use ExecutionStatus as S;

        assert_eq!(next_execution_status(S::InProgress, A::Start), None);
        assert_eq!(next_execution_status(S::NotStarted, A::Pause), None);
        assert_eq!(next_execution_status(S::InProgress, A::Resume), None);
        assert_eq!(next_execution_status(S::Completed, A::Complete), None);
        assert_eq!(next_execution_status(S::NotStarted, A::Fail), None);
        for action in [A::Start, A::Pause, A::Resume, A::Complete, A::Cancel, A::Fail] {
            assert_eq!(next_execution_status(S::Cancelled, action), None);
            assert_eq!(next_execution_status(S::Failed, action), None);
        }
    }

    #[test]
    fn sample_transitions() {
        use SampleAction as A;
        use SampleStatus as S;

        assert_eq!(next_sample_status(S::Pending, A::Start), Some(S::InProgress));
        assert_eq!(next_sample_status(S::InProgress, A::Start), None);
        assert_eq!(next_sample_status(S::Pending, A::Complete), Some(S::Completed));
        assert_eq!(next_sample_status(S::Completed, A::Complete), None);
        assert_eq!(next_sample_status(S::Skipped, A::Skip), None);
        assert_eq!(next_sample_status(S::InProgress, A::Fail), Some(S::Failed));
    }

    #[test]
    fn export_transitions() {
        use ExportStatus as S;

        assert!(can_transition_export(S::Pending, S::InProgress));
        assert!(can_transition_export(S::InProgress, S::InProgress));
        assert!(can_transition_export(S::InProgress, S::Completed));
        assert!(!can_transition_export(S::Pending, S::Completed));
        assert!(!can_transition_export(S::Completed, S::Expired));
        assert!(!can_transition_export(S::Expired, S::InProgress));
    }
}
