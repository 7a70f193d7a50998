//! Sample lifecycle tests

use edith_tracker::lifecycle::CreateExecutionRequest;
use edith_tracker::record::{Operator, SampleQuality, SampleRecord, SampleStatus};
use edith_tracker::{Error, Tracker};

async fn setup(names: &[&str]) -> (Tracker, String, Vec<SampleRecord>) {
    let tracker = Tracker::in_memory();
    let exec = tracker
        .executions()
        .create_execution(
            CreateExecutionRequest::new("Sterility", "USP 71", "microbiology")
                .samples(names.iter().copied()),
            Operator::new("op-1"),
        )
        .await
        .expect("create failed");
    tracker.executions().start(exec.id()).await.expect("start failed");
    let samples = tracker.samples().list_samples(exec.id()).await.unwrap();
    (tracker, exec.id().to_string(), samples)
}

#[tokio::test]
async fn test_start_sample_records_operator() {
    let (tracker, _, samples) = setup(&["A"]).await;
    let operator = Operator::new("op-7").with_email("op7@lab.example");

    let started = tracker.samples().start(samples[0].id(), operator.clone()).await.unwrap();
    assert_eq!(started.status(), SampleStatus::InProgress);
    assert_eq!(started.operator(), Some(&operator));
    assert!(started.started_at().is_some());
    assert_eq!(started.progress(), 0);

    let err = tracker.samples().start(samples[0].id(), operator).await.unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test]
async fn test_start_sample_requires_operator() {
    let (tracker, _, samples) = setup(&["A"]).await;
    let err = tracker.samples().start(samples[0].id(), Operator::new(" ")).await.unwrap_err();
    assert!(matches!(err, Error::Validation { field: "operatorId", .. }));
}

#[tokio::test]
async fn test_complete_after_start() {
    let (tracker, _, samples) = setup(&["A"]).await;
    tracker.samples().start(samples[0].id(), Operator::new("op-1")).await.unwrap();

    let done = tracker
        .samples()
        .complete(samples[0].id(), "Warning", Some("slight turbidity".into()))
        .await
        .unwrap();
    assert_eq!(done.status(), SampleStatus::Completed);
    assert_eq!(done.quality(), Some(SampleQuality::Warning));
    assert_eq!(done.progress(), 100);
    assert_eq!(done.notes(), Some("slight turbidity"));
    assert!(done.completed_at().is_some());

    let err = tracker.samples().complete(samples[0].id(), "pass", None).await.unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test]
async fn test_skip_requires_reason() {
    let (tracker, _, samples) = setup(&["A"]).await;

    let err = tracker.samples().skip(samples[0].id(), "   ").await.unwrap_err();
    assert!(matches!(err, Error::Validation { field: "reason", .. }));
    assert_eq!(
        tracker.samples().get_sample(samples[0].id()).await.unwrap().status(),
        SampleStatus::Pending
    );

    let skipped = tracker.samples().skip(samples[0].id(), "contaminated").await.unwrap();
    assert_eq!(skipped.status(), SampleStatus::Skipped);
    assert_eq!(skipped.notes(), Some("contaminated"));
    assert_eq!(skipped.progress(), 100);
}

#[tokio::test]
async fn test_failed_sample_is_terminal() {
    let (tracker, exec_id, samples) = setup(&["A", "B"]).await;

    let failed = tracker.samples().fail(samples[0].id(), "vial cracked").await.unwrap();
    assert_eq!(failed.status(), SampleStatus::Failed);
    assert!(tracker.samples().skip(samples[0].id(), "late").await.unwrap_err().is_invalid_transition());

    let report = tracker.executions().progress(&exec_id).await.unwrap();
    assert_eq!(report.current_step, 0);
    assert_eq!(report.failed_samples, 0);
}

#[tokio::test]
async fn test_anomalies_accumulate() {
    let (tracker, _, samples) = setup(&["A"]).await;
    tracker.samples().record_anomaly(samples[0].id(), "bubble in vial").await.unwrap();
    tracker.samples().complete(samples[0].id(), "pass", None).await.unwrap();
    let sample = tracker
        .samples()
        .record_anomaly(samples[0].id(), "label smudged")
        .await
        .unwrap();

    assert_eq!(sample.anomalies(), ["bubble in vial", "label smudged"]);
    assert_eq!(sample.status(), SampleStatus::Completed);
}

#[tokio::test]
async fn test_samples_move_independently() {
    let (tracker, _, samples) = setup(&["A", "B", "C"]).await;
    tracker.samples().skip(samples[2].id(), "not needed").await.unwrap();
    tracker.samples().start(samples[0].id(), Operator::new("op-1")).await.unwrap();

    let statuses: Vec<SampleStatus> = tracker
        .samples()
        .list_samples(samples[0].execution_id())
        .await
        .unwrap()
        .iter()
        .map(SampleRecord::status)
        .collect();
    assert_eq!(
        statuses,
        vec![SampleStatus::InProgress, SampleStatus::Pending, SampleStatus::Skipped]
    );
}

#[tokio::test]
async fn test_unknown_ids() {
    let (tracker, _, _) = setup(&["A"]).await;
    assert!(tracker.samples().get_sample("missing").await.unwrap_err().is_not_found());
    assert!(tracker.samples().list_samples("missing").await.unwrap_err().is_not_found());
    assert!(tracker
        .samples()
        .start("missing", Operator::new("op-1"))
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_cancelled_execution_locks_samples() {
    let (tracker, exec_id, samples) = setup(&["A"]).await;
    tracker.executions().cancel(&exec_id, "withdrawn").await.unwrap();

    for err in [
        tracker.samples().start(samples[0].id(), Operator::new("op-1")).await.unwrap_err(),
        tracker.samples().skip(samples[0].id(), "late").await.unwrap_err(),
        tracker.samples().record_anomaly(samples[0].id(), "late note").await.unwrap_err(),
    ] {
        assert!(err.is_invalid_transition(), "{err}");
    }
}

#[tokio::test]
async fn test_completed_execution_keeps_frozen_counts() {
    let (tracker, exec_id, samples) = setup(&["A", "B"]).await;
    tracker.samples().complete(samples[0].id(), "pass", None).await.unwrap();
    let done = tracker.executions().complete(&exec_id, None, None).await.unwrap();

    let err = tracker.samples().complete(samples[1].id(), "fail", None).await.unwrap_err();
    assert!(err.is_invalid_transition(), "{err}");

    let stored = tracker.samples().get_sample(samples[1].id()).await.unwrap();
    assert_eq!(stored.status(), SampleStatus::Pending);
    let reread = tracker.executions().get_execution(&exec_id).await.unwrap();
    assert_eq!(reread.passed_samples(), done.passed_samples());
    assert_eq!(reread.failed_samples(), 0);
    assert_eq!(reread.overall_status(), done.overall_status());
}
