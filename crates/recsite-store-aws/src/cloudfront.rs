//! Edge cache adapter.

use aws_sdk_cloudfront::Client;
use aws_sdk_cloudfront::types::{InvalidationBatch, Paths};
use recsite_store::{CacheInvalidator, InvalidationRequest, StoreError, StoreErrorKind};

use crate::error::{error_chain, sdk_error};
use crate::{AwsContext, missing_field};

const BACKEND: &str = "CloudFront";

/// [`CacheInvalidator`] for one `CloudFront` distribution.
pub struct CloudFrontInvalidator {
    ctx: AwsContext,
    client: Client,
    distribution_id: String,
}

impl CloudFrontInvalidator {
    pub fn new(ctx: &AwsContext, distribution_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(ctx.sdk_config()),
            ctx: ctx.clone(),
            distribution_id: distribution_id.into(),
        }
    }
}

fn build_batch(request: &InvalidationRequest) -> Result<InvalidationBatch, StoreError> {
    let invalid = |e: &dyn std::error::Error| {
        StoreError::new(StoreErrorKind::InvalidKey)
            .with_backend(BACKEND)
            .with_message(error_chain(e))
    };
    let paths = Paths::builder()
        .quantity(i32::try_from(request.paths.len()).unwrap_or(i32::MAX))
        .set_items(Some(request.paths.clone()))
        .build()
        .map_err(|e| invalid(&e))?;
    InvalidationBatch::builder()
        .paths(paths)
        .caller_reference(&request.caller_reference)
        .build()
        .map_err(|e| invalid(&e))
}

impl CacheInvalidator for CloudFrontInvalidator {
    fn invalidate(&self, request: &InvalidationRequest) -> Result<String, StoreError> {
        let batch = build_batch(request)?;
        let output = self
            .ctx
            .block_on(
                self.client
                    .create_invalidation()
                    .distribution_id(&self.distribution_id)
                    .invalidation_batch(batch)
                    .send(),
            )
            .map_err(|e| sdk_error(BACKEND, &e).with_key(&self.distribution_id))?;

        let id = output
            .invalidation()
            .map(|invalidation| invalidation.id().to_owned())
            .ok_or_else(|| missing_field(BACKEND, "Invalidation"))?;
        tracing::debug!(
            distribution_id = %self.distribution_id,
            invalidation_id = %id,
            "Created invalidation"
        );
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_build_batch() {
        let batch = build_batch(&InvalidationRequest {
            paths: vec!["/acme/index.html".to_owned(), "/acme/planning/index.html".to_owned()],
            caller_reference: "cycle-1".to_owned(),
        })
        .unwrap();

        assert_eq!(batch.caller_reference(), "cycle-1");
        let paths = batch.paths().unwrap();
        assert_eq!(paths.quantity(), 2);
        assert_eq!(paths.items(), ["/acme/index.html", "/acme/planning/index.html"]);
    }
}
