//! AWS adapters: a DynamoDB table as the source store and a Kinesis Data Firehose delivery
//! stream as the sink.

pub mod attribute;
pub mod dynamodb;
mod error;
pub mod firehose;

use aws_config::{BehaviorVersion, SdkConfig};

/// Loads the shared AWS configuration from the default provider chain.
pub async fn load_sdk_config() -> SdkConfig {
    aws_config::load_defaults(BehaviorVersion::latest()).await
}
