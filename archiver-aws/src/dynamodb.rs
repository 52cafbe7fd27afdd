use std::time::Duration;

use archiver::bail;
use archiver::error::{ArchiverResult, ErrorKind};
use archiver::source::{DeleteFailure, DeleteOutcome, Page, SourceStore};
use archiver::types::PrimaryKey;
use archiver_config::shared::SourceConfig;
use aws_config::SdkConfig;
use aws_sdk_dynamodb::Client;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::types::{DeleteRequest, WriteRequest};
use tracing::{debug, warn};

use crate::attribute::{Item, item_to_record, key_to_item};
use crate::error::classify_sdk_error;

/// Maximum number of write requests in one `BatchWriteItem` call.
pub const MAX_BATCH_WRITE_ITEMS: usize = 25;

/// Attempts made to resubmit unprocessed deletions before reporting them as failed.
const UNPROCESSED_RETRY_ATTEMPTS: u32 = 5;

/// Delay before the first resubmission, doubled on each attempt.
const UNPROCESSED_RETRY_BASE_DELAY: Duration = Duration::from_millis(50);

/// A DynamoDB table drained with paginated scans and purged with batch deletes.
#[derive(Debug, Clone)]
pub struct DynamoDbSource {
    client: Client,
    table_name: String,
    page_size: Option<i32>,
}

impl DynamoDbSource {
    /// Creates a source for the table named by `config`, honoring its region and endpoint
    /// overrides.
    pub fn new(sdk_config: &SdkConfig, config: &SourceConfig) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);
        if let Some(region) = &config.region {
            builder = builder.region(Region::new(region.clone()));
        }
        if let Some(endpoint_url) = &config.endpoint_url {
            builder = builder.endpoint_url(endpoint_url);
        }

        Self::from_client(Client::from_conf(builder.build()), config)
    }

    fn from_client(client: Client, config: &SourceConfig) -> Self {
        let page_size = config
            .page_size
            .map(|size| i32::try_from(size).unwrap_or(i32::MAX));

        Self {
            client,
            table_name: config.table_name.clone(),
            page_size,
        }
    }

    /// Deletes one chunk of keys with `BatchWriteItem`, resubmitting unprocessed requests.
    ///
    /// Falls back to individual deletions when the batch call itself fails.
    async fn delete_chunk(&self, keys: Vec<PrimaryKey>) -> Vec<DeleteFailure> {
        let mut pending = Vec::with_capacity(keys.len());
        let mut failures = Vec::new();
        for key in keys {
            match delete_request(&key) {
                Ok(request) => pending.push((key, request)),
                Err(err) => failures.push(DeleteFailure {
                    key,
                    reason: err.to_string(),
                }),
            }
        }

        let mut attempt = 0;
        while !pending.is_empty() {
            let requests = pending
                .iter()
                .map(|(_, request)| request.clone())
                .collect::<Vec<_>>();

            let output = match self
                .client
                .batch_write_item()
                .request_items(&self.table_name, requests)
                .send()
                .await
            {
                Ok(output) => output,
                Err(err) => {
                    let err = classify_sdk_error(
                        err,
                        "Batch deletion failed",
                        ErrorKind::DeletionFailed,
                        ErrorKind::DeletionFailed,
                    );
                    warn!(
                        keys = pending.len(),
                        %err,
                        "batch deletion failed, deleting keys one by one"
                    );
                    let keys = pending.into_iter().map(|(key, _)| key).collect();
                    failures.extend(self.delete_individually(keys).await);
                    return failures;
                }
            };

            let unprocessed = output
                .unprocessed_items
                .and_then(|mut items| items.remove(&self.table_name))
                .unwrap_or_default();
            if unprocessed.is_empty() {
                break;
            }

            pending.retain(|(_, request)| unprocessed.contains(request));

            if attempt == UNPROCESSED_RETRY_ATTEMPTS {
                failures.extend(pending.into_iter().map(|(key, _)| DeleteFailure {
                    key,
                    reason: format!(
                        "deletion still unprocessed after {UNPROCESSED_RETRY_ATTEMPTS} retries"
                    ),
                }));
                break;
            }

            let delay = UNPROCESSED_RETRY_BASE_DELAY * 2u32.pow(attempt);
            debug!(
                unprocessed = pending.len(),
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                "resubmitting unprocessed deletions"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }

        failures
    }

    async fn delete_individually(&self, keys: Vec<PrimaryKey>) -> Vec<DeleteFailure> {
        let mut failures = Vec::new();
        for key in keys {
            let result = self
                .client
                .delete_item()
                .table_name(&self.table_name)
                .set_key(Some(key_to_item(&key)))
                .send()
                .await;

            if let Err(err) = result {
                let err = classify_sdk_error(
                    err,
                    "Deletion failed",
                    ErrorKind::DeletionFailed,
                    ErrorKind::DeletionFailed,
                );
                failures.push(DeleteFailure {
                    key,
                    reason: err.to_string(),
                });
            }
        }

        failures
    }
}

fn delete_request(key: &PrimaryKey) -> ArchiverResult<WriteRequest> {
    let request = match DeleteRequest::builder().set_key(Some(key_to_item(key))).build() {
        Ok(request) => request,
        Err(err) => bail!(
            ErrorKind::InvalidData,
            "Could not build delete request",
            detail = format!("key {key}"),
            source: err
        ),
    };

    Ok(WriteRequest::builder().delete_request(request).build())
}

impl SourceStore for DynamoDbSource {
    type Cursor = Item;

    fn name() -> &'static str {
        "dynamodb"
    }

    async fn validate(&self) -> ArchiverResult<()> {
        self.client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
            .map_err(|err| {
                classify_sdk_error(
                    err,
                    "Source table could not be described",
                    ErrorKind::SourceNotFound,
                    ErrorKind::SourceUnavailable,
                )
            })?;

        Ok(())
    }

    async fn scan_page(&self, cursor: Option<Item>) -> ArchiverResult<Page<Item>> {
        let output = self
            .client
            .scan()
            .table_name(&self.table_name)
            .set_exclusive_start_key(cursor)
            .set_limit(self.page_size)
            .send()
            .await
            .map_err(|err| {
                classify_sdk_error(
                    err,
                    "Source table scan failed",
                    ErrorKind::SourceNotFound,
                    ErrorKind::SourceUnavailable,
                )
            })?;

        let records = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(item_to_record)
            .collect::<ArchiverResult<Vec<_>>>()?;

        Ok(Page {
            records,
            next_cursor: output.last_evaluated_key.filter(|key| !key.is_empty()),
        })
    }

    async fn delete_keys(&self, keys: Vec<PrimaryKey>) -> ArchiverResult<DeleteOutcome> {
        let mut failures = Vec::new();
        let mut keys = keys.into_iter().peekable();
        while keys.peek().is_some() {
            let chunk = keys.by_ref().take(MAX_BATCH_WRITE_ITEMS).collect();
            failures.extend(self.delete_chunk(chunk).await);
        }

        Ok(DeleteOutcome { failures })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use archiver::types::{SourceRecord, Value};
    use aws_sdk_dynamodb::config::retry::RetryConfig;
    use aws_sdk_dynamodb::error::ErrorMetadata;
    use aws_sdk_dynamodb::operation::batch_write_item::{
        BatchWriteItemError, BatchWriteItemInput, BatchWriteItemOutput,
    };
    use aws_sdk_dynamodb::operation::delete_item::{DeleteItemError, DeleteItemOutput};
    use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
    use aws_sdk_dynamodb::operation::scan::{ScanError, ScanOutput};
    use aws_sdk_dynamodb::types::AttributeValue;
    use aws_sdk_dynamodb::types::error::{
        ConditionalCheckFailedException, InternalServerError, ResourceNotFoundException,
    };
    use aws_smithy_mocks::{Rule, RuleMode, mock, mock_client};

    use super::*;

    const TABLE: &str = "infra-core-api-audit-log";

    fn source(rules: &[&Rule]) -> DynamoDbSource {
        let client = mock_client!(aws_sdk_dynamodb, RuleMode::Sequential, rules, |conf| {
            conf.retry_config(RetryConfig::disabled())
        });
        let config = SourceConfig {
            table_name: TABLE.to_string(),
            region: None,
            endpoint_url: None,
            page_size: Some(1),
        };

        DynamoDbSource::from_client(client, &config)
    }

    fn key(id: &str) -> PrimaryKey {
        PrimaryKey::new(vec![("id".to_string(), Value::from(id))])
    }

    fn item(id: &str) -> Item {
        HashMap::from([("id".to_string(), AttributeValue::S(id.to_string()))])
    }

    fn not_found() -> ResourceNotFoundException {
        ResourceNotFoundException::builder()
            .message("Requested resource not found")
            .meta(
                ErrorMetadata::builder()
                    .code("ResourceNotFoundException")
                    .build(),
            )
            .build()
    }

    fn submitted(input: &BatchWriteItemInput) -> usize {
        input
            .request_items()
            .and_then(|items| items.get(TABLE))
            .map_or(0, Vec::len)
    }

    fn unprocessed(ids: &[&str]) -> BatchWriteItemOutput {
        let requests = ids
            .iter()
            .map(|id| delete_request(&key(id)))
            .collect::<ArchiverResult<Vec<_>>>()
            .unwrap();

        BatchWriteItemOutput::builder()
            .unprocessed_items(TABLE, requests)
            .build()
    }

    #[tokio::test]
    async fn scan_ends_on_empty_last_evaluated_key() {
        let first = mock!(aws_sdk_dynamodb::Client::scan)
            .match_requests(|input| {
                input.exclusive_start_key().is_none() && input.limit() == Some(1)
            })
            .then_output(|| {
                ScanOutput::builder()
                    .items(item("a"))
                    .set_last_evaluated_key(Some(item("a")))
                    .build()
            });
        let last = mock!(aws_sdk_dynamodb::Client::scan)
            .match_requests(|input| input.exclusive_start_key() == Some(&item("a")))
            .then_output(|| {
                ScanOutput::builder()
                    .items(item("b"))
                    .set_last_evaluated_key(Some(HashMap::new()))
                    .build()
            });
        let source = source(&[&first, &last]);

        let page = source.scan_page(None).await.unwrap();
        assert_eq!(
            page.records,
            vec![SourceRecord::from_iter([("id", Value::from("a"))])]
        );
        let cursor = page.next_cursor;
        assert_eq!(cursor, Some(item("a")));

        let page = source.scan_page(cursor).await.unwrap();
        assert_eq!(
            page.records,
            vec![SourceRecord::from_iter([("id", Value::from("b"))])]
        );
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn missing_table_is_not_found() {
        let describe = mock!(aws_sdk_dynamodb::Client::describe_table)
            .then_error(|| DescribeTableError::ResourceNotFoundException(not_found()));
        let scan = mock!(aws_sdk_dynamodb::Client::scan)
            .then_error(|| ScanError::ResourceNotFoundException(not_found()));
        let source = source(&[&describe, &scan]);

        let err = source.validate().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceNotFound);

        let err = source.scan_page(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceNotFound);
    }

    #[tokio::test]
    async fn failed_scan_is_unavailable() {
        let scan = mock!(aws_sdk_dynamodb::Client::scan).then_error(|| {
            ScanError::InternalServerError(InternalServerError::builder().message("boom").build())
        });
        let source = source(&[&scan]);

        let err = source.scan_page(None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
        assert!(err.halts_run());
    }

    #[tokio::test]
    async fn unprocessed_deletions_are_resubmitted() {
        let partial = mock!(aws_sdk_dynamodb::Client::batch_write_item)
            .match_requests(|input| submitted(input) == 2)
            .then_output(|| unprocessed(&["b"]));
        let retry = mock!(aws_sdk_dynamodb::Client::batch_write_item)
            .match_requests(|input| submitted(input) == 1)
            .then_output(|| BatchWriteItemOutput::builder().build());
        let source = source(&[&partial, &retry]);

        let outcome = source.delete_keys(vec![key("a"), key("b")]).await.unwrap();

        assert!(outcome.failures.is_empty());
        assert_eq!((partial.num_calls(), retry.num_calls()), (1, 1));
    }

    #[tokio::test]
    async fn deletions_left_unprocessed_fail_per_key() {
        let rules = (0..=UNPROCESSED_RETRY_ATTEMPTS)
            .map(|_| {
                mock!(aws_sdk_dynamodb::Client::batch_write_item)
                    .then_output(|| unprocessed(&["b"]))
            })
            .collect::<Vec<_>>();
        let source = source(&rules.iter().collect::<Vec<_>>());

        let outcome = source.delete_keys(vec![key("a"), key("b")]).await.unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].key, key("b"));
        assert!(outcome.failures[0].reason.contains("still unprocessed"));
        assert!(rules.iter().all(|rule| rule.num_calls() == 1));
    }

    #[tokio::test]
    async fn failed_batch_call_falls_back_to_single_deletions() {
        let batch = mock!(aws_sdk_dynamodb::Client::batch_write_item).then_error(|| {
            BatchWriteItemError::InternalServerError(
                InternalServerError::builder().message("boom").build(),
            )
        });
        let deleted = mock!(aws_sdk_dynamodb::Client::delete_item)
            .match_requests(|input| input.key() == Some(&item("a")))
            .then_output(|| DeleteItemOutput::builder().build());
        let refused = mock!(aws_sdk_dynamodb::Client::delete_item)
            .match_requests(|input| input.key() == Some(&item("b")))
            .then_error(|| {
                DeleteItemError::ConditionalCheckFailedException(
                    ConditionalCheckFailedException::builder()
                        .message("condition failed")
                        .build(),
                )
            });
        let source = source(&[&batch, &deleted, &refused]);

        let outcome = source.delete_keys(vec![key("a"), key("b")]).await.unwrap();

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].key, key("b"));
        assert_eq!((deleted.num_calls(), refused.num_calls()), (1, 1));
    }

    #[tokio::test]
    async fn deletions_are_chunked_by_the_batch_limit() {
        let full = mock!(aws_sdk_dynamodb::Client::batch_write_item)
            .match_requests(|input| submitted(input) == MAX_BATCH_WRITE_ITEMS)
            .then_output(|| BatchWriteItemOutput::builder().build());
        let rest = mock!(aws_sdk_dynamodb::Client::batch_write_item)
            .match_requests(|input| submitted(input) == 5)
            .then_output(|| BatchWriteItemOutput::builder().build());
        let source = source(&[&full, &rest]);

        let keys = (0..30).map(|id| key(&id.to_string())).collect();
        let outcome = source.delete_keys(keys).await.unwrap();

        assert!(outcome.failures.is_empty());
        assert_eq!((full.num_calls(), rest.num_calls()), (1, 1));
    }
}
