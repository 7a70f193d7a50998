//! Export job lifecycle tests

use chrono::{Duration, Utc};
use edith_tracker::export::ExportRequest;
use edith_tracker::lifecycle::CreateExecutionRequest;
use edith_tracker::record::{
    ExecutionRecord, ExportFormat, ExportOptions, ExportStatus, ExportUpdate, NewMeasurement,
    Operator,
};
use edith_tracker::store::MemoryStore;
use edith_tracker::{Error, Tracker};

async fn setup(tracker: &Tracker) -> ExecutionRecord {
    tracker
        .executions()
        .create_execution(
            CreateExecutionRequest::new("Stability", "ICH Q1A", "stability").samples(["A", "B"]),
            Operator::new("op-1"),
        )
        .await
        .expect("create failed")
}

#[tokio::test]
async fn test_request_export_derives_filename() {
    let tracker = Tracker::in_memory();
    let exec = setup(&tracker).await;

    let export = tracker
        .exports()
        .request_export(ExportRequest::new(exec.id(), "pdf", "EXECUTION_REPORT", "op-1"))
        .await
        .unwrap();

    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();
    assert_eq!(export.filename(), format!("edith-execution-report-{today}.pdf"));
    assert_eq!(export.format(), ExportFormat::Pdf);
    assert_eq!(export.status(), ExportStatus::Pending);
    assert_eq!(export.progress(), 0);
    assert_eq!(export.expires_at() - export.requested_at(), Duration::days(7));
}

#[tokio::test]
async fn test_filename_per_format() {
    let tracker = Tracker::in_memory();
    let exec = setup(&tracker).await;
    for (format, ext) in [("EXCEL", "excel"), ("Csv", "csv"), ("json", "json")] {
        let export = tracker
            .exports()
            .request_export(ExportRequest::new(exec.id(), format, "Sample_Summary", "op-1"))
            .await
            .unwrap();
        assert!(export.filename().starts_with("edith-sample-summary-"));
        assert!(export.filename().ends_with(&format!(".{ext}")));
    }
}

#[tokio::test]
async fn test_request_export_validation() {
    let tracker = Tracker::in_memory();
    let exec = setup(&tracker).await;

    let err = tracker
        .exports()
        .request_export(ExportRequest::new(exec.id(), "DOCX", "EXECUTION_REPORT", "op-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation { field: "format", .. }));

    let err = tracker
        .exports()
        .request_export(ExportRequest::new("ghost", "PDF", "EXECUTION_REPORT", "op-1"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(tracker.store().export_count(), 0);
}

#[tokio::test]
async fn test_export_lifecycle() {
    let tracker = Tracker::in_memory();
    let exec = setup(&tracker).await;
    let export = tracker
        .exports()
        .request_export(ExportRequest::new(exec.id(), "CSV", "RAW_DATA", "op-1"))
        .await
        .unwrap();

    let running = tracker
        .exports()
        .update_export_status(export.id(), ExportUpdate::status(ExportStatus::InProgress).with_progress(10))
        .await
        .unwrap();
    assert_eq!(running.status(), ExportStatus::InProgress);
    assert!(running.started_at().is_some());

    let running = tracker
        .exports()
        .update_export_status(export.id(), ExportUpdate::status(ExportStatus::InProgress).with_progress(60))
        .await
        .unwrap();
    assert_eq!(running.progress(), 60);

    let done = tracker
        .exports()
        .update_export_status(export.id(), ExportUpdate::status(ExportStatus::Completed).with_size(4096))
        .await
        .unwrap();
    assert_eq!(done.status(), ExportStatus::Completed);
    assert_eq!(done.progress(), 100);
    assert_eq!(done.size(), Some(4096));
    assert!(done.completed_at().is_some());

    let err = tracker
        .exports()
        .update_export_status(export.id(), ExportUpdate::status(ExportStatus::Failed))
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());
}

#[tokio::test]
async fn test_export_rejected_by_renderer() {
    let tracker = Tracker::in_memory();
    let exec = setup(&tracker).await;
    let export = tracker
        .exports()
        .request_export(ExportRequest::new(exec.id(), "PDF", "EXECUTION_REPORT", "op-1"))
        .await
        .unwrap();

    let err = tracker
        .exports()
        .update_export_status(export.id(), ExportUpdate::status(ExportStatus::Completed))
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());

    let failed = tracker
        .exports()
        .update_export_status(
            export.id(),
            ExportUpdate::status(ExportStatus::Failed).with_error("template missing"),
        )
        .await
        .unwrap();
    assert_eq!(failed.status(), ExportStatus::Failed);
    assert_eq!(failed.errors(), ["template missing"]);
}

#[tokio::test]
async fn test_progress_out_of_range() {
    let tracker = Tracker::in_memory();
    let exec = setup(&tracker).await;
    let export = tracker
        .exports()
        .request_export(ExportRequest::new(exec.id(), "PDF", "EXECUTION_REPORT", "op-1"))
        .await
        .unwrap();
    let err = tracker
        .exports()
        .update_export_status(export.id(), ExportUpdate::status(ExportStatus::InProgress).with_progress(101))
        .await
        .unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn test_late_progress_report_keeps_maximum() {
    let tracker = Tracker::in_memory();
    let exec = setup(&tracker).await;
    let export = tracker
        .exports()
        .request_export(ExportRequest::new(exec.id(), "CSV", "SAMPLE_DATA", "op-1"))
        .await
        .unwrap();
    for progress in [80, 20] {
        tracker
            .exports()
            .update_export_status(export.id(), ExportUpdate::status(ExportStatus::InProgress).with_progress(progress))
            .await
            .unwrap();
    }
    assert_eq!(tracker.exports().get_export(export.id()).await.unwrap().progress(), 80);
}

#[tokio::test]
async fn test_expire_overdue_sweep() {
    let tracker = Tracker::builder(MemoryStore::new())
        .export_ttl_hours(1)
        .build()
        .unwrap();
    let exec = setup(&tracker).await;

    let pending = tracker
        .exports()
        .request_export(ExportRequest::new(exec.id(), "PDF", "EXECUTION_REPORT", "op-1"))
        .await
        .unwrap();
    let running = tracker
        .exports()
        .request_export(ExportRequest::new(exec.id(), "CSV", "RAW_DATA", "op-1"))
        .await
        .unwrap();
    tracker
        .exports()
        .update_export_status(running.id(), ExportUpdate::status(ExportStatus::InProgress))
        .await
        .unwrap();
    let finished = tracker
        .exports()
        .request_export(ExportRequest::new(exec.id(), "JSON", "RAW_DATA", "op-1"))
        .await
        .unwrap();
    tracker
        .exports()
        .update_export_status(finished.id(), ExportUpdate::status(ExportStatus::Failed))
        .await
        .unwrap();

    assert_eq!(tracker.exports().expire_overdue(Utc::now()).await.unwrap(), 0);
    let err = tracker
        .exports()
        .update_export_status(pending.id(), ExportUpdate::status(ExportStatus::Expired))
        .await
        .unwrap_err();
    assert!(err.is_invalid_transition());

    let later = Utc::now() + Duration::hours(2);
    assert_eq!(tracker.exports().expire_overdue(later).await.unwrap(), 2);
    assert_eq!(tracker.exports().expire_overdue(later).await.unwrap(), 0);

    let expired = tracker.exports().get_export(pending.id()).await.unwrap();
    assert_eq!(expired.status(), ExportStatus::Expired);
    assert!(expired.completed_at().is_some());
    assert_eq!(expired.errors().len(), 1);
    assert_eq!(
        tracker.exports().get_export(running.id()).await.unwrap().status(),
        ExportStatus::Expired
    );
    assert_eq!(
        tracker.exports().get_export(finished.id()).await.unwrap().status(),
        ExportStatus::Failed
    );
}

#[tokio::test]
async fn test_exports_independent_of_execution() {
    let tracker = Tracker::in_memory();
    let exec = setup(&tracker).await;
    tracker.executions().start(exec.id()).await.unwrap();

    let before = tracker
        .exports()
        .request_export(ExportRequest::new(exec.id(), "PDF", "EXECUTION_REPORT", "op-1"))
        .await
        .unwrap();
    tracker.executions().complete(exec.id(), None, None).await.unwrap();
    let after = tracker
        .exports()
        .request_export(ExportRequest::new(exec.id(), "PDF", "EXECUTION_REPORT", "op-1"))
        .await
        .unwrap();

    assert_ne!(before.id(), after.id());
    assert_eq!(tracker.exports().list_exports(exec.id()).await.unwrap().len(), 2);
    assert_eq!(
        tracker.exports().get_export(before.id()).await.unwrap().status(),
        ExportStatus::Pending
    );
}

#[tokio::test]
async fn test_source_applies_options() {
    let tracker = Tracker::in_memory();
    let exec = setup(&tracker).await;
    let samples = tracker.samples().list_samples(exec.id()).await.unwrap();
    for sample in &samples {
        tracker
            .measurements()
            .add_measurement(NewMeasurement::new(sample.id(), "step-1", "assay", "op-1").value(99.1))
            .await
            .unwrap();
    }
    tracker.samples().complete(samples[1].id(), "pass", None).await.unwrap();

    let full = tracker
        .exports()
        .request_export(ExportRequest::new(exec.id(), "JSON", "RAW_DATA", "op-1"))
        .await
        .unwrap();
    let source = tracker.exports().source(full.id()).await.unwrap();
    assert_eq!(source.samples.len(), 2);
    assert_eq!(source.measurements.len(), 2);
    assert_eq!(source.execution.completion_percentage(), 50);

    let options = ExportOptions {
        include_measurements: true,
        sample_numbers: vec![2],
        ..ExportOptions::default()
    };
    let narrow = tracker
        .exports()
        .request_export(ExportRequest::new(exec.id(), "JSON", "RAW_DATA", "op-1").with_options(options))
        .await
        .unwrap();
    let source = tracker.exports().source(narrow.id()).await.unwrap();
    assert_eq!(source.samples.len(), 1);
    assert_eq!(source.samples[0].sample_number(), 2);
    assert_eq!(source.measurements.len(), 1);
    assert_eq!(source.measurements[0].sample_id(), samples[1].id());

    let summary = tracker
        .exports()
        .request_export(
            ExportRequest::new(exec.id(), "PDF", "SUMMARY", "op-1").with_options(ExportOptions {
                include_measurements: false,
                ..ExportOptions::default()
            }),
        )
        .await
        .unwrap();
    assert!(tracker.exports().source(summary.id()).await.unwrap().measurements.is_empty());
}
