//! Website bucket adapter.

use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use recsite_store::{BlobStore, StoreError, StoreErrorKind};

use crate::AwsContext;
use crate::error::{error_chain, sdk_error};

const BACKEND: &str = "S3";

/// [`BlobStore`] backed by an S3 bucket.
pub struct S3BlobStore {
    ctx: AwsContext,
    client: Client,
    bucket: String,
    key_prefix: Option<String>,
}

impl S3BlobStore {
    /// Create a store for `bucket`, optionally nesting every key under
    /// `key_prefix`.
    pub fn new(ctx: &AwsContext, bucket: impl Into<String>, key_prefix: Option<String>) -> Self {
        Self {
            client: build_client(ctx),
            ctx: ctx.clone(),
            bucket: bucket.into(),
            key_prefix: key_prefix
                .map(|p| p.trim_matches('/').to_owned())
                .filter(|p| !p.is_empty()),
        }
    }

    fn full_key(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{prefix}/{key}"),
            None => key.to_owned(),
        }
    }
}

fn build_client(ctx: &AwsContext) -> Client {
    // Custom endpoints (LocalStack, MinIO) require path-style addressing
    // (endpoint/bucket/key) instead of virtual-hosted-style (bucket.endpoint/key).
    if ctx.has_custom_endpoint() {
        let s3_config = aws_sdk_s3::config::Builder::from(ctx.sdk_config())
            .force_path_style(true)
            .build();
        return Client::from_conf(s3_config);
    }
    Client::new(ctx.sdk_config())
}

impl BlobStore for S3BlobStore {
    fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StoreError> {
        let full_key = self.full_key(key);
        self.ctx
            .block_on(
                self.client
                    .put_object()
                    .bucket(&self.bucket)
                    .key(&full_key)
                    .body(ByteStream::from(body.to_vec()))
                    .content_type(content_type)
                    .send(),
            )
            .map_err(|e| sdk_error(BACKEND, &e).with_key(&full_key))?;
        tracing::debug!(bucket = %self.bucket, key = %full_key, "Uploaded");
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let full_key = self.full_key(key);
        self.ctx.block_on(async {
            let output = match self
                .client
                .get_object()
                .bucket(&self.bucket)
                .key(&full_key)
                .send()
                .await
            {
                Ok(output) => output,
                Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                    return Ok(None);
                }
                Err(e) => return Err(sdk_error(BACKEND, &e).with_key(&full_key)),
            };
            let bytes = output.body.collect().await.map_err(|e| {
                StoreError::new(StoreErrorKind::Unavailable)
                    .with_backend(BACKEND)
                    .with_key(&full_key)
                    .with_message(error_chain(&e))
            })?;
            Ok::<_, StoreError>(Some(bytes.into_bytes().to_vec()))
        })
    }
}
