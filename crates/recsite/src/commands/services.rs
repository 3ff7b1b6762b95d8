//! Wiring of configured AWS collaborators into pipeline components.

use std::sync::Arc;

use recsite_config::{CliSettings, Config, QueueConfig, QueueTarget};
use recsite_pipeline::{Cascade, InvalidationBatcher, PagePublisher};
use recsite_render::{PageRenderer, TemplateSource};
use recsite_store::{BlobStore, CacheInvalidator, Catalog, NotificationQueue};
use recsite_store_aws::{
    AwsContext, AwsSettings, CloudFrontInvalidator, DynamoCatalog, IndexNames, S3BlobStore,
    SqsQueue,
};

use crate::GlobalArgs;
use crate::error::CliError;

/// Loaded configuration plus the AWS context adapters are built from.
pub(super) struct Services {
    pub(super) config: Config,
    ctx: AwsContext,
}

impl Services {
    /// Load configuration and connect to AWS.
    pub(super) fn connect(global: &GlobalArgs) -> Result<Self, CliError> {
        let cli_settings = CliSettings {
            region: global.region.clone(),
            endpoint: global.endpoint.clone(),
        };
        let config = Config::load(global.config.as_deref(), Some(&cli_settings))?;
        let ctx = AwsContext::connect(&AwsSettings {
            region: config.aws.region.clone(),
            endpoint: config.aws.endpoint.clone(),
        })?;
        Ok(Self { config, ctx })
    }

    fn catalog(&self) -> Result<Arc<dyn Catalog>, CliError> {
        let catalog = self.config.require_catalog()?;
        let indexes = IndexNames {
            topic: catalog.topic_index.clone(),
            organization: catalog.organization_index.clone(),
        };
        Ok(Arc::new(DynamoCatalog::new(
            &self.ctx,
            catalog.table_name()?,
            indexes,
        )))
    }

    /// Build the page cascade over the catalog and the site bucket.
    ///
    /// Template overrides come from `site.template_dir` when set, otherwise
    /// from `site.templates_prefix` in the bucket.
    pub(super) fn cascade(&self) -> Result<Cascade, CliError> {
        let site = self.config.require_site()?;
        let store: Arc<dyn BlobStore> = Arc::new(S3BlobStore::new(
            &self.ctx,
            site.bucket.clone(),
            site.key_prefix.clone(),
        ));

        let source = match &site.template_dir {
            Some(dir) => TemplateSource::Directory(dir),
            None => TemplateSource::Blob {
                store: store.as_ref(),
                prefix: &site.templates_prefix,
            },
        };
        let renderer = PageRenderer::load(&source)?;
        tracing::info!(bucket = %site.bucket, "Loaded page templates");

        Ok(Cascade::new(
            self.catalog()?,
            Arc::new(renderer),
            PagePublisher::new(store),
        ))
    }

    /// Build the invalidation batcher for the configured distribution.
    pub(super) fn batcher(&self) -> Result<InvalidationBatcher, CliError> {
        let cdn = self.config.require_cdn()?;
        let invalidator: Arc<dyn CacheInvalidator> =
            Arc::new(CloudFrontInvalidator::new(&self.ctx, cdn.distribution_id.clone()));
        Ok(InvalidationBatcher::new(invalidator).with_threshold(cdn.invalidation_threshold))
    }

    /// Build the notification queue, resolving its URL from the ARN if needed.
    pub(super) fn queue(&self) -> Result<(&QueueConfig, Arc<dyn NotificationQueue>), CliError> {
        let queue_config = self.config.require_queue()?;
        let queue = match queue_config.target()? {
            QueueTarget::Url(url) => SqsQueue::new(&self.ctx, url),
            QueueTarget::Named { name, account_id } => {
                SqsQueue::from_name(&self.ctx, &name, &account_id)?
            }
        };
        tracing::info!(queue_url = %queue.queue_url(), "Using notification queue");
        Ok((queue_config, Arc::new(queue)))
    }
}
