use archiver::bail;
use archiver::error::{ArchiverResult, ErrorKind};
use archiver::sink::{EntryResult, Sink, SinkResponse};
use archiver_config::shared::SinkConfig;
use aws_config::SdkConfig;
use aws_sdk_firehose::Client;
use aws_sdk_firehose::config::Region;
use aws_sdk_firehose::primitives::Blob;
use aws_sdk_firehose::types::{PutRecordBatchResponseEntry, Record};
use bytes::Bytes;

use crate::error::classify_sdk_error;

/// Maximum number of records in one `PutRecordBatch` call.
pub const MAX_PUT_RECORD_BATCH_RECORDS: usize = 500;

/// A Kinesis Data Firehose delivery stream.
#[derive(Debug, Clone)]
pub struct FirehoseSink {
    client: Client,
    stream_name: String,
}

impl FirehoseSink {
    /// Creates a sink for the delivery stream named by `config`, honoring its region and
    /// endpoint overrides.
    pub fn new(sdk_config: &SdkConfig, config: &SinkConfig) -> Self {
        let mut builder = aws_sdk_firehose::config::Builder::from(sdk_config);
        if let Some(region) = &config.region {
            builder = builder.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        Self::from_client(Client::from_conf(builder.build()), config)
    }

    fn from_client(client: Client, config: &SinkConfig) -> Self {
        Self {
            client,
            stream_name: config.stream_name.clone(),
        }
    }
}

fn record(data: Bytes) -> ArchiverResult<Record> {
    match Record::builder().data(Blob::new(data.to_vec())).build() {
        Ok(record) => Ok(record),
        Err(err) => bail!(
            ErrorKind::InvalidData,
            "Could not build sink record",
            source: err
        ),
    }
}

fn entry_result(entry: &PutRecordBatchResponseEntry) -> EntryResult {
    match entry.error_code() {
        Some(code) => EntryResult::Failed {
            code: code.to_owned(),
            message: entry.error_message().unwrap_or_default().to_owned(),
        },
        None => EntryResult::Accepted {
            record_id: entry.record_id().map(str::to_owned),
        },
    }
}

impl Sink for FirehoseSink {
    fn name() -> &'static str {
        "firehose"
    }

    async fn validate(&self) -> ArchiverResult<()> {
        self.client
            .describe_delivery_stream()
            .delivery_stream_name(&self.stream_name)
            .send()
            .await
            .map_err(|err| {
                classify_sdk_error(
                    err,
                    "Delivery stream could not be described",
                    ErrorKind::SinkNotFound,
                    ErrorKind::SinkCallFailed,
                )
            })?;

        Ok(())
    }

    fn max_batch_records(&self) -> usize {
        MAX_PUT_RECORD_BATCH_RECORDS
    }

    async fn put_batch(&self, records: Vec<Bytes>) -> ArchiverResult<SinkResponse> {
        let records = records
            .into_iter()
            .map(record)
            .collect::<ArchiverResult<Vec<_>>>()?;

        let output = self
            .client
            .put_record_batch()
            .delivery_stream_name(&self.stream_name)
            .set_records(Some(records))
            .send()
            .await
            .map_err(|err| {
                classify_sdk_error(
                    err,
                    "Delivery stream rejected the batch call",
                    ErrorKind::SinkNotFound,
                    ErrorKind::SinkCallFailed,
                )
            })?;

        Ok(SinkResponse {
            failed_put_count: usize::try_from(output.failed_put_count()).unwrap_or_default(),
            entries: output.request_responses().iter().map(entry_result).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_firehose::config::retry::RetryConfig;
    use aws_sdk_firehose::error::ErrorMetadata;
    use aws_sdk_firehose::operation::describe_delivery_stream::DescribeDeliveryStreamError;
    use aws_sdk_firehose::operation::put_record_batch::{PutRecordBatchError, PutRecordBatchOutput};
    use aws_sdk_firehose::types::error::{ResourceNotFoundException, ServiceUnavailableException};
    use aws_smithy_mocks::{Rule, RuleMode, mock, mock_client};

    use super::*;

    fn sink(rules: &[&Rule]) -> FirehoseSink {
        let client = mock_client!(aws_sdk_firehose, RuleMode::Sequential, rules, |conf| {
            conf.retry_config(RetryConfig::disabled())
        });
        let config = SinkConfig {
            stream_name: "infra-core-api-archive".to_string(),
            region: None,
            endpoint_url: None,
        };

        FirehoseSink::from_client(client, &config)
    }

    #[test]
    fn failed_entries_carry_their_error() {
        let entry = PutRecordBatchResponseEntry::builder()
            .error_code("ServiceUnavailableException")
            .error_message("slow down")
            .build();

        assert_eq!(
            entry_result(&entry),
            EntryResult::Failed {
                code: "ServiceUnavailableException".to_string(),
                message: "slow down".to_string(),
            }
        );
    }

    #[test]
    fn accepted_entries_carry_their_record_id() {
        let entry = PutRecordBatchResponseEntry::builder().record_id("49").build();

        assert_eq!(
            entry_result(&entry),
            EntryResult::Accepted {
                record_id: Some("49".to_string()),
            }
        );
    }

    #[tokio::test]
    async fn missing_stream_is_not_found() {
        let describe = mock!(aws_sdk_firehose::Client::describe_delivery_stream).then_error(|| {
            DescribeDeliveryStreamError::ResourceNotFoundException(
                ResourceNotFoundException::builder()
                    .message("Delivery stream not found")
                    .meta(
                        ErrorMetadata::builder()
                            .code("ResourceNotFoundException")
                            .build(),
                    )
                    .build(),
            )
        });
        let sink = sink(&[&describe]);

        let err = sink.validate().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SinkNotFound);
        assert!(err.halts_run());
    }

    #[tokio::test]
    async fn batch_response_keeps_submission_order() {
        let put = mock!(aws_sdk_firehose::Client::put_record_batch)
            .match_requests(|input| {
                input.delivery_stream_name() == Some("infra-core-api-archive")
            })
            .then_output(|| {
                PutRecordBatchOutput::builder()
                    .failed_put_count(1)
                    .request_responses(
                        PutRecordBatchResponseEntry::builder().record_id("1").build(),
                    )
                    .request_responses(
                        PutRecordBatchResponseEntry::builder()
                            .error_code("InternalFailure")
                            .error_message("try again")
                            .build(),
                    )
                    .build()
                    .unwrap()
            });
        let sink = sink(&[&put]);

        let response = sink
            .put_batch(vec![Bytes::from_static(b"a\n"), Bytes::from_static(b"b\n")])
            .await
            .unwrap();

        assert_eq!(response.failed_put_count, 1);
        assert_eq!(
            response.entries,
            vec![
                EntryResult::Accepted {
                    record_id: Some("1".to_string()),
                },
                EntryResult::Failed {
                    code: "InternalFailure".to_string(),
                    message: "try again".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn failed_batch_call_is_a_call_failure() {
        let put = mock!(aws_sdk_firehose::Client::put_record_batch).then_error(|| {
            PutRecordBatchError::ServiceUnavailableException(
                ServiceUnavailableException::builder()
                    .message("slow down")
                    .build(),
            )
        });
        let sink = sink(&[&put]);

        let err = sink
            .put_batch(vec![Bytes::from_static(b"a\n")])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SinkCallFailed);
        assert!(!err.halts_run());
    }
}
