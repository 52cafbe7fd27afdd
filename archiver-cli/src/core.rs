use std::path::Path;

use anyhow::Context;
use archiver::archive::{Archiver, TimestampMapper};
use archiver::drain::{Driver, Termination};
use archiver::sink::Sink;
use archiver_aws::dynamodb::DynamoDbSource;
use archiver_aws::firehose::FirehoseSink;
use archiver_aws::load_sdk_config;
use archiver_config::shared::ArchiverConfig;
use tracing::{debug, info};

/// Drains the configured table into the configured delivery stream.
///
/// A run that halted is returned as an error after its tallies were logged.
pub async fn start_drain(config: ArchiverConfig) -> anyhow::Result<()> {
    info!("starting drain");
    log_config(&config);

    let sdk_config = load_sdk_config().await;
    let source = DynamoDbSource::new(&sdk_config, &config.source);
    let sink = FirehoseSink::new(&sdk_config, &config.sink);

    let report = Driver::from_config(source, sink, &config).run().await;
    info!(%report, "drain finished");

    if let Termination::Halted(err) = report.termination {
        return Err(err).context("drain run halted");
    }

    Ok(())
}

/// Archives the expired records of the change-event document stored at `events`.
pub async fn start_archive(config: ArchiverConfig, events: &Path) -> anyhow::Result<()> {
    info!(events = %events.display(), "starting archive");
    log_config(&config);

    let document = tokio::fs::read(events)
        .await
        .with_context(|| format!("failed to read change events from {}", events.display()))?;

    let sdk_config = load_sdk_config().await;
    let sink = FirehoseSink::new(&sdk_config, &config.sink);
    sink.validate().await?;

    let archiver =
        Archiver::new(sink, TimestampMapper::with_defaults()).with_batch_size(config.batch.max_size);
    let report = archiver.archive_json(&document).await?;

    info!(
        received = report.received,
        ignored = report.ignored,
        skipped = report.skipped,
        archived = report.archived,
        rejected = report.rejected,
        "archive finished"
    );

    Ok(())
}

fn log_config(config: &ArchiverConfig) {
    debug!(
        table = %config.source.table_name,
        region = config.source.region.as_deref().unwrap_or("default"),
        endpoint_url = config.source.endpoint_url.as_deref().unwrap_or("default"),
        page_size = ?config.source.page_size,
        "source config"
    );
    debug!(
        stream = %config.sink.stream_name,
        region = config.sink.region.as_deref().unwrap_or("default"),
        endpoint_url = config.sink.endpoint_url.as_deref().unwrap_or("default"),
        "sink config"
    );
    debug!(
        output_attributes = ?config.projection.output_attributes,
        key_attributes = ?config.projection.key_attributes,
        batch_size = config.batch.max_size,
        "projection config"
    );
}
