//! Execution lifecycle tests
//!
//! Covers creation, the start/pause/resume/complete machine, the terminal
//! cancel and fail paths, and live vs frozen statistics.

use edith_tracker::lifecycle::{CreateExecutionRequest, SampleSpec};
use edith_tracker::record::{ExecutionRecord, ExecutionStatus, NewMeasurement, Operator, OverallStatus};
use edith_tracker::store::ExecutionFilter;
use edith_tracker::{Error, Tracker};

fn request(names: &[&str]) -> CreateExecutionRequest {
    CreateExecutionRequest::new("Accelerated Stability", "ICH Q1A(R2)", "stability")
        .study_id("study-42")
        .protocol_id("proto-7")
        .samples(names.iter().copied())
}

async fn created(tracker: &Tracker, names: &[&str]) -> ExecutionRecord {
    tracker
        .executions()
        .create_execution(request(names), Operator::new("op-1").with_name("Ada"))
        .await
        .expect("create failed")
}

// =============================================================================
// Creation
// =============================================================================

#[tokio::test]
async fn test_create_execution_allocates_samples() {
    let tracker = Tracker::in_memory();
    let exec = created(&tracker, &["A", "B", "C", "D"]).await;

    assert_eq!(exec.status(), ExecutionStatus::NotStarted);
    assert_eq!(exec.total_steps(), 4);
    assert_eq!(exec.study_id(), "study-42");
    assert_eq!(exec.operator().name.as_deref(), Some("Ada"));
    assert!(exec.progress().abs() < f64::EPSILON);

    let samples = tracker.samples().list_samples(exec.id()).await.unwrap();
    let labels: Vec<(u32, &str)> = samples.iter().map(|s| (s.sample_number(), s.name())).collect();
    assert_eq!(labels, vec![(1, "A"), (2, "B"), (3, "C"), (4, "D")]);
}

#[tokio::test]
async fn test_create_execution_keeps_metadata() {
    let tracker = Tracker::in_memory();
    let request = CreateExecutionRequest::new("S", "P", "microbiology")
        .sample(SampleSpec::new("Plate 1").with_metadata(serde_json::json!({"agar": "blood"})))
        .environment(serde_json::json!({"room": "B12"}))
        .test_conditions(serde_json::json!({"temp_c": 37}));
    let exec = tracker
        .executions()
        .create_execution(request, Operator::new("op-1"))
        .await
        .unwrap();

    assert_eq!(exec.environment(), Some(&serde_json::json!({"room": "B12"})));
    let samples = tracker.samples().list_samples(exec.id()).await.unwrap();
    let sample = &samples[0];
    assert_eq!(sample.metadata(), Some(&serde_json::json!({"agar": "blood"})));
}

#[tokio::test]
async fn test_create_execution_validation() {
    let tracker = Tracker::in_memory();

    let err = tracker
        .executions()
        .create_execution(
            CreateExecutionRequest::new("S", "", "c").samples(["A"]),
            Operator::new("op-1"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { field: "protocolName", .. }));

    let err = tracker
        .executions()
        .create_execution(CreateExecutionRequest::new("S", "P", "c"), Operator::new("op-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { field: "samples", .. }));

    assert!(tracker.store().is_empty());
}

// =============================================================================
// State machine
// =============================================================================

#[tokio::test]
async fn test_start_only_once() {
    let tracker = Tracker::in_memory();
    let exec = created(&tracker, &["A"]).await;

    let started = tracker.executions().start(exec.id()).await.unwrap();
    assert_eq!(started.status(), ExecutionStatus::InProgress);
    assert!(started.started_at().is_some());

    let err = tracker.executions().start(exec.id()).await.unwrap_err();
    match err {
        Error::InvalidTransition { current, action, .. } => {
            assert_eq!(current, "IN_PROGRESS");
            assert_eq!(action, "start");
        }
        other => panic!("expected InvalidTransition, got {other:?}"),
    }
}

#[tokio::test]
async fn test_pause_resume_leaves_samples_untouched() {
    let tracker = Tracker::in_memory();
    let exec = created(&tracker, &["A", "B"]).await;
    tracker.executions().start(exec.id()).await.unwrap();

    let samples = tracker.samples().list_samples(exec.id()).await.unwrap();
    tracker
        .measurements()
        .add_measurement(NewMeasurement::new(samples[0].id(), "s1", "ph", "op-1").value(6.9))
        .await
        .unwrap();
    let ledger_before = tracker.measurements().list_for_execution(exec.id()).await.unwrap();

    let paused = tracker
        .executions()
        .pause(exec.id(), Some("instrument calibration".into()))
        .await
        .unwrap();
    assert_eq!(paused.status(), ExecutionStatus::Paused);
    assert!(paused.paused_at().is_some());
    assert_eq!(paused.notes(), Some("instrument calibration"));

    let resumed = tracker.executions().resume(exec.id()).await.unwrap();
    assert_eq!(resumed.status(), ExecutionStatus::InProgress);
    assert!(resumed.paused_at().is_none());

    assert_eq!(tracker.samples().list_samples(exec.id()).await.unwrap(), samples);
    assert_eq!(
        tracker.measurements().list_for_execution(exec.id()).await.unwrap(),
        ledger_before
    );
}

#[tokio::test]
async fn test_pause_and_resume_preconditions() {
    let tracker = Tracker::in_memory();
    let exec = created(&tracker, &["A"]).await;

    assert!(tracker.executions().pause(exec.id(), None).await.unwrap_err().is_invalid_transition());
    assert!(tracker.executions().resume(exec.id()).await.unwrap_err().is_invalid_transition());

    tracker.executions().start(exec.id()).await.unwrap();
    assert!(tracker.executions().resume(exec.id()).await.unwrap_err().is_invalid_transition());
}

#[tokio::test]
async fn test_complete_twice_fails() {
    let tracker = Tracker::in_memory();
    let exec = created(&tracker, &["A"]).await;
    tracker.executions().start(exec.id()).await.unwrap();

    let done = tracker
        .executions()
        .complete(exec.id(), Some("all good".into()), Some("repeat in Q3".into()))
        .await
        .unwrap();
    assert_eq!(done.status(), ExecutionStatus::Completed);
    assert_eq!(done.summary(), Some("all good"));
    assert_eq!(done.recommendations(), Some("repeat in Q3"));
    assert!(done.completed_at().is_some());

    let err = tracker.executions().complete(exec.id(), None, None).await.unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test]
async fn test_complete_from_paused() {
    let tracker = Tracker::in_memory();
    let exec = created(&tracker, &["A"]).await;
    tracker.executions().start(exec.id()).await.unwrap();
    tracker.executions().pause(exec.id(), None).await.unwrap();

    let done = tracker.executions().complete(exec.id(), None, None).await.unwrap();
    assert_eq!(done.status(), ExecutionStatus::Completed);
    assert!(done.paused_at().is_none());
}

#[tokio::test]
async fn test_cancel_keeps_partial_statistics() {
    let tracker = Tracker::in_memory();
    let exec = created(&tracker, &["A", "B"]).await;
    tracker.executions().start(exec.id()).await.unwrap();
    let samples = tracker.samples().list_samples(exec.id()).await.unwrap();
    tracker.samples().complete(samples[0].id(), "pass", None).await.unwrap();

    assert!(tracker.executions().cancel(exec.id(), "").await.unwrap_err().is_validation());

    let cancelled = tracker.executions().cancel(exec.id(), "study withdrawn").await.unwrap();
    assert_eq!(cancelled.status(), ExecutionStatus::Cancelled);
    assert_eq!(cancelled.notes(), Some("study withdrawn"));
    assert_eq!(cancelled.completion_percentage(), 50);
    assert_eq!(cancelled.passed_samples(), 1);
    assert_eq!(cancelled.overall_status(), OverallStatus::Passed);

    assert!(tracker.executions().start(exec.id()).await.unwrap_err().is_invalid_transition());
}

// =============================================================================
// Statistics
// =============================================================================

#[tokio::test]
async fn test_scenario_pass_fail_skip() {
    let tracker = Tracker::in_memory();
    let exec = created(&tracker, &["A", "B", "C"]).await;
    tracker.executions().start(exec.id()).await.unwrap();
    let samples = tracker.samples().list_samples(exec.id()).await.unwrap();

    tracker.samples().complete(samples[0].id(), "pass", None).await.unwrap();
    tracker.samples().complete(samples[1].id(), "fail", None).await.unwrap();
    tracker.samples().skip(samples[2].id(), "contaminated").await.unwrap();

    let done = tracker.executions().complete(exec.id(), None, None).await.unwrap();
    assert!((done.progress() - 100.0).abs() < f64::EPSILON);
    assert_eq!(done.passed_samples(), 1);
    assert_eq!(done.failed_samples(), 1);
    assert_eq!(done.overall_status(), OverallStatus::Partial);
    assert_eq!(done.current_step(), 3);
}

#[tokio::test]
async fn test_get_execution_reports_live_progress() {
    let tracker = Tracker::in_memory();
    let exec = created(&tracker, &["A", "B", "C", "D"]).await;
    tracker.executions().start(exec.id()).await.unwrap();
    let samples = tracker.samples().list_samples(exec.id()).await.unwrap();

    tracker.samples().complete(samples[0].id(), "pass", None).await.unwrap();
    let live = tracker.executions().get_execution(exec.id()).await.unwrap();
    assert_eq!(live.completion_percentage(), 25);
    assert_eq!(live.current_step(), 1);
    assert_eq!(live.overall_status(), OverallStatus::Passed);

    let report = tracker.executions().progress(exec.id()).await.unwrap();
    assert_eq!(report.completion_percentage, 25);
    assert_eq!(report.total_samples, 4);
}

#[tokio::test]
async fn test_terminal_execution_freezes_statistics() {
    let tracker = Tracker::in_memory();
    let exec = created(&tracker, &["A", "B"]).await;
    tracker.executions().start(exec.id()).await.unwrap();
    let samples = tracker.samples().list_samples(exec.id()).await.unwrap();
    tracker.samples().complete(samples[0].id(), "fail", None).await.unwrap();
    tracker.executions().complete(exec.id(), None, None).await.unwrap();

    let err = tracker
        .samples()
        .complete(samples[1].id(), "pass", None)
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());

    let frozen = tracker.executions().get_execution(exec.id()).await.unwrap();
    assert_eq!(frozen.overall_status(), OverallStatus::Failed);
    assert_eq!(frozen.failed_samples(), 1);
    assert_eq!(frozen.current_step(), 1);
}

// =============================================================================
// Listing
// =============================================================================

#[tokio::test]
async fn test_list_executions_filters_and_pages() {
    let tracker = Tracker::builder(edith_tracker::store::MemoryStore::new())
        .default_page_size(2)
        .build()
        .unwrap();
    for _ in 0..3 {
        created(&tracker, &["A"]).await;
    }
    let other = tracker
        .executions()
        .create_execution(
            CreateExecutionRequest::new("Other", "P", "sterility").samples(["X"]),
            Operator::new("op-2"),
        )
        .await
        .unwrap();
    tracker.executions().start(other.id()).await.unwrap();

    let all = tracker
        .executions()
        .list_executions(&ExecutionFilter::all(), None, None)
        .await
        .unwrap();
    assert_eq!(all.total, 4);
    assert_eq!(all.items.len(), 2);
    assert_eq!(all.total_pages(), 2);

    let stability = tracker
        .executions()
        .list_executions(&ExecutionFilter::all().category("stability"), Some(1), Some(10))
        .await
        .unwrap();
    assert_eq!(stability.total, 3);

    let running = tracker
        .executions()
        .list_executions(
            &ExecutionFilter::all().status(ExecutionStatus::InProgress),
            None,
            None,
        )
        .await
        .unwrap();
    assert_eq!(running.total, 1);
    assert_eq!(running.items[0].id(), other.id());

    let by_operator = tracker
        .executions()
        .list_executions(&ExecutionFilter::all().operator("op-2"), None, None)
        .await
        .unwrap();
    assert_eq!(by_operator.items[0].study_name(), "Other");
}
