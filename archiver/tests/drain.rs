#![cfg(feature = "test-utils")]

use archiver::drain::{DrainReport, Driver};
use archiver::error::ErrorKind;
use archiver::sink::memory::MemorySink;
use archiver::source::memory::MemorySource;
use archiver::test_utils::record::{
    audit_log_key, audit_log_projector, audit_log_record, audit_log_record_without,
    audit_log_records, seeded_source,
};
use archiver_telemetry::tracing::init_test_tracing;

const BATCH_SIZE: usize = 500;

async fn drain(source: &MemorySource, sink: &MemorySink, batch_size: usize) -> DrainReport {
    Driver::new(
        source.clone(),
        sink.clone(),
        audit_log_projector(),
        batch_size,
    )
    .run()
    .await
}

fn assert_never_lose(report: &DrainReport) {
    assert!(report.deleted <= report.sent, "{report:?}");
    assert!(report.sent <= report.scanned, "{report:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn full_delivery_purges_everything() {
    init_test_tracing();
    let source = seeded_source(1200, 100).await;
    let sink = MemorySink::new();

    let report = drain(&source, &sink, BATCH_SIZE).await;

    assert!(report.is_completed());
    assert_eq!(sink.batch_sizes().await, vec![500, 500, 200]);
    assert_eq!((report.scanned, report.sent, report.deleted), (1200, 1200, 1200));
    assert_eq!(report.batches, 3);
    assert!(source.is_empty().await);
    assert_eq!(sink.delivered().await.len(), 1200);
}

#[tokio::test(flavor = "multi_thread")]
async fn payloads_are_json_lines_with_configured_attributes() {
    init_test_tracing();
    let source = seeded_source(1, 100).await;
    let sink = MemorySink::new();

    drain(&source, &sink, BATCH_SIZE).await;

    let delivered = sink.delivered().await;
    assert_eq!(
        std::str::from_utf8(&delivered[0]).unwrap(),
        "{\"module\":\"module-0\",\"createdAt\":1700000000,\"actor\":\"admin@example.com\",\
         \"message\":\"updated entry 0\",\"requestId\":\"req-0\",\"target\":\"acm\"}\n"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_record_is_retained() {
    init_test_tracing();
    let source = seeded_source(500, 100).await;
    let sink = MemorySink::new();
    sink.reject_entry(1, 37).await;

    let report = drain(&source, &sink, BATCH_SIZE).await;

    assert!(report.is_completed());
    assert_eq!(report.rejected, 1);
    assert_eq!((report.sent, report.deleted), (499, 499));
    assert_eq!(source.records().await, vec![audit_log_record(37)]);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_sink_call_keeps_its_batch_and_continues() {
    init_test_tracing();
    let source = seeded_source(1200, 100).await;
    let sink = MemorySink::new();
    sink.fail_call(2).await;

    let report = drain(&source, &sink, BATCH_SIZE).await;

    assert!(report.is_completed());
    assert_eq!((report.scanned, report.sent, report.deleted), (1200, 700, 700));
    assert_eq!(report.rejected, 500);
    assert_eq!(report.batches, 3);
    assert_eq!(source.records().await, audit_log_records(1000)[500..].to_vec());
}

#[tokio::test(flavor = "multi_thread")]
async fn record_without_sort_key_is_excluded() {
    init_test_tracing();
    let source = MemorySource::with_page_size(100);
    let mut records = audit_log_records(10);
    records[4] = audit_log_record_without(4, "createdAt");
    source.insert_records(records).await;
    let sink = MemorySink::new();

    let report = drain(&source, &sink, BATCH_SIZE).await;

    assert!(report.is_completed());
    assert_eq!(report.scanned, 10);
    assert_eq!(report.skipped, 1);
    assert_eq!((report.sent, report.deleted), (9, 9));
    assert_eq!(sink.batch_sizes().await, vec![9]);
    assert_eq!(
        source.records().await,
        vec![audit_log_record_without(4, "createdAt")]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn second_run_deletes_nothing_new() {
    init_test_tracing();
    let source = seeded_source(1200, 100).await;
    let sink = MemorySink::new();

    let first = drain(&source, &sink, BATCH_SIZE).await;
    let second = drain(&source, &sink, BATCH_SIZE).await;

    assert_eq!(first.deleted, 1200);
    assert!(second.is_completed());
    assert_eq!((second.scanned, second.sent, second.deleted), (0, 0, 0));
    assert_eq!(sink.delivered().await.len(), 1200);
}

#[tokio::test(flavor = "multi_thread")]
async fn rerun_retries_what_remains() {
    init_test_tracing();
    let source = seeded_source(600, 100).await;
    let sink = MemorySink::new();
    sink.fail_call(1).await;

    let first = drain(&source, &sink, BATCH_SIZE).await;
    let second = drain(&source, &sink, BATCH_SIZE).await;

    assert_eq!((first.sent, first.deleted), (100, 100));
    assert_eq!((second.scanned, second.sent, second.deleted), (500, 500, 500));
    assert!(source.is_empty().await);
}

#[tokio::test(flavor = "multi_thread")]
async fn only_delivered_records_are_ever_deleted() {
    init_test_tracing();
    let source = seeded_source(1234, 64).await;
    let sink = MemorySink::new();
    sink.reject_entry(1, 0).await;
    sink.reject_entry(3, 99).await;
    sink.fail_call(2).await;
    source.fail_delete(audit_log_key(5)).await;

    let report = drain(&source, &sink, 250).await;

    assert!(report.is_completed());
    assert_never_lose(&report);
    assert_eq!(report.scanned, 1234);
    assert_eq!(report.sent, 1234 - 250 - 2);
    assert_eq!(report.delete_failures, 1);
    assert_eq!(report.deleted, report.sent - 1);
    assert!(sink.batch_sizes().await.iter().all(|size| *size <= 250));

    // Every record still in the source is untouched and every missing one was delivered.
    let remaining = source.records().await;
    let delivered = sink.delivered().await;
    for index in 0..1234 {
        let record = audit_log_record(index);
        if remaining.contains(&record) {
            continue;
        }

        let request_id = format!("\"requestId\":\"req-{index}\"");
        assert!(
            delivered
                .iter()
                .any(|payload| std::str::from_utf8(payload).unwrap().contains(&request_id)),
            "record {index} was deleted without being delivered"
        );
    }
    assert_eq!(remaining.len() as u64, 1234 - report.deleted);
}

#[tokio::test(flavor = "multi_thread")]
async fn unavailable_source_halts_with_partial_tallies() {
    init_test_tracing();
    let source = seeded_source(1200, 100).await;
    source.fail_scan(8).await;
    let sink = MemorySink::new();

    let report = drain(&source, &sink, BATCH_SIZE).await;

    assert_eq!(
        report.error().map(|err| err.kind()),
        Some(ErrorKind::SourceUnavailable)
    );
    assert_eq!((report.scanned, report.sent, report.deleted), (700, 500, 500));
    assert_eq!(source.len().await, 700);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_table_halts_before_any_work() {
    init_test_tracing();
    let source = seeded_source(10, 100).await;
    source.set_missing(true).await;
    let sink = MemorySink::new();

    let report = drain(&source, &sink, BATCH_SIZE).await;

    assert_eq!(
        report.error().map(|err| err.kind()),
        Some(ErrorKind::SourceNotFound)
    );
    assert_eq!((report.scanned, report.sent, report.deleted), (0, 0, 0));
    assert_eq!(sink.calls().await, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_stream_halts_before_any_work() {
    init_test_tracing();
    let source = seeded_source(10, 100).await;
    let sink = MemorySink::new();
    sink.set_missing(true).await;

    let report = drain(&source, &sink, BATCH_SIZE).await;

    assert_eq!(
        report.error().map(|err| err.kind()),
        Some(ErrorKind::SinkNotFound)
    );
    assert_eq!(report.scanned, 0);
    assert_eq!(source.len().await, 10);
}
