//! AWS adapters for the recordings site collaborators.
//!
//! - [`DynamoCatalog`] - meeting table and its secondary indexes
//! - [`S3BlobStore`] - website bucket
//! - [`SqsQueue`] - change notification queue
//! - [`CloudFrontInvalidator`] - distribution in front of the bucket
//!
//! The collaborator traits are synchronous. All adapters created from one
//! [`AwsContext`] share its SDK configuration and a multi-thread tokio
//! runtime, and block on that runtime for each call. They must not be called
//! from inside another async runtime.

mod cloudfront;
mod dynamo;
mod error;
mod s3;
mod sqs;

use std::future::Future;
use std::sync::Arc;

use aws_config::SdkConfig;
use recsite_store::{ErrorStatus, StoreError, StoreErrorKind};
use tokio::runtime::Runtime;

pub use cloudfront::CloudFrontInvalidator;
pub use dynamo::{DynamoCatalog, IndexNames};
pub use s3::S3BlobStore;
pub use sqs::SqsQueue;

/// Connection settings shared by every adapter.
#[derive(Debug, Clone)]
pub struct AwsSettings {
    /// AWS region.
    pub region: String,
    /// Custom endpoint (`LocalStack`, `MinIO`).
    pub endpoint: Option<String>,
}

/// Loaded SDK configuration plus the runtime adapters block on.
#[derive(Clone)]
pub struct AwsContext {
    runtime: Arc<Runtime>,
    sdk_config: SdkConfig,
    endpoint: Option<String>,
}

impl AwsContext {
    /// Start the runtime and load credentials and region.
    pub fn connect(settings: &AwsSettings) -> Result<Self, StoreError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                StoreError::new(StoreErrorKind::Other)
                    .with_backend("AWS")
                    .with_source(e)
            })?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(settings.region.clone()));
        if let Some(endpoint) = &settings.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = runtime.block_on(loader.load());
        tracing::debug!(
            region = %settings.region,
            endpoint = ?settings.endpoint,
            "Loaded AWS config"
        );

        Ok(Self {
            runtime: Arc::new(runtime),
            sdk_config,
            endpoint: settings.endpoint.clone(),
        })
    }

    pub(crate) fn sdk_config(&self) -> &SdkConfig {
        &self.sdk_config
    }

    /// Whether a custom endpoint is configured.
    pub(crate) fn has_custom_endpoint(&self) -> bool {
        self.endpoint.is_some()
    }

    pub(crate) fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

/// Error for a response that lacks a field the adapter needs.
pub(crate) fn missing_field(backend: &'static str, field: &str) -> StoreError {
    StoreError::new(StoreErrorKind::Other)
        .with_status(ErrorStatus::Permanent)
        .with_backend(backend)
        .with_message(format!("response missing {field}"))
}
