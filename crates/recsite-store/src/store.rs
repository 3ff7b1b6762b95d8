//! Collaborator traits and error types.
//!
//! Provides the [`Catalog`], [`BlobStore`], [`NotificationQueue`], and
//! [`CacheInvalidator`] traits along with [`StoreError`] for unified error
//! handling across backends.
//!
//! # Key Convention
//!
//! Blob keys are relative page keys without a leading slash:
//! - `"acme/index.html"` - organization page
//! - `"acme/weekly-sync/index.html"` - topic page
//! - `"acme/weekly-sync/2024-01-01T10:05/index.html"` - meeting page
//!
//! Invalidation paths are absolute (`"/acme/index.html"`, `"/*"`).

use std::time::Duration;

use crate::model::{MeetingOccurrence, Notification};

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StoreErrorKind {
    /// Resource (object, table, index, queue) does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Invalid key or identifier.
    InvalidKey,
    /// Backend is temporarily unavailable.
    Unavailable,
    /// Too many requests.
    RateLimited,
    /// Operation timed out.
    Timeout,
    /// A stored record could not be decoded into the model.
    Decode,
    /// Other/unknown error category.
    Other,
}

/// Retry guidance.
#[derive(Debug, PartialEq, Eq, Default)]
pub enum ErrorStatus {
    /// Don't retry (config error, missing index, invalid key).
    #[default]
    Permanent,
    /// Retry immediately (timeout, connection reset).
    Temporary,
    /// Retry with backoff (rate limited, service unavailable).
    Persistent,
}

/// Store error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StoreError {
    /// Semantic error category.
    pub kind: StoreErrorKind,
    /// Retry guidance.
    pub status: ErrorStatus,
    /// Key, identifier, or index context (if applicable).
    pub key: Option<String>,
    /// Backend identifier (e.g., "S3", "DynamoDB", "Mock").
    pub backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StoreError {
    /// Create a new store error.
    #[must_use]
    pub fn new(kind: StoreErrorKind) -> Self {
        Self {
            kind,
            status: ErrorStatus::Permanent,
            key: None,
            backend: None,
            source: None,
        }
    }

    /// Attach key context.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set retry status.
    #[must_use]
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach a plain message as the error source.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        let message: String = message.into();
        self.source = Some(message.into());
        self
    }

    /// Downcast the source error to a concrete type.
    #[must_use]
    pub fn downcast_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.as_ref()?.downcast_ref()
    }

    /// Create a not found error with key.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::NotFound).with_key(key)
    }

    /// Create a decode error for a malformed record.
    #[must_use]
    pub fn decode(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(StoreErrorKind::Decode)
            .with_key(key)
            .with_message(message)
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.status != ErrorStatus::Permanent
    }
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (key: acme/index.html)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StoreErrorKind::NotFound => "Not found",
            StoreErrorKind::PermissionDenied => "Permission denied",
            StoreErrorKind::InvalidKey => "Invalid key",
            StoreErrorKind::Unavailable => "Unavailable",
            StoreErrorKind::RateLimited => "Rate limited",
            StoreErrorKind::Timeout => "Timeout",
            StoreErrorKind::Decode => "Decode error",
            StoreErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(key) = &self.key {
            write!(f, " (key: {key})")?;
        }

        Ok(())
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Opaque continuation token for paginated scans.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanCursor(pub String);

/// One page of a full catalog scan.
#[derive(Debug, Default)]
pub struct ScanPage {
    /// Records in this page, in backend order.
    pub items: Vec<MeetingOccurrence>,
    /// Cursor for the next page, `None` when the scan is complete.
    pub next: Option<ScanCursor>,
}

/// Document store holding meeting records and their secondary indexes.
///
/// Query results are unordered. An empty result is `Ok(vec![])`; a missing
/// index or table is an error.
pub trait Catalog: Send + Sync {
    /// Point lookup by recording id.
    ///
    /// Returns `Ok(None)` if no record has this id.
    fn get(&self, recording_id: &str) -> Result<Option<MeetingOccurrence>, StoreError>;

    /// All occurrences with the given `meeting_topic`, across organizations.
    fn query_by_topic(&self, topic: &str) -> Result<Vec<MeetingOccurrence>, StoreError>;

    /// All occurrences hosted by the given organization.
    fn query_by_organization(
        &self,
        organization: &str,
    ) -> Result<Vec<MeetingOccurrence>, StoreError>;

    /// One page of a full table scan.
    ///
    /// # Arguments
    ///
    /// * `cursor` - Continuation from the previous page, `None` to start
    /// * `limit` - Upper bound on records evaluated for this page
    fn scan_page(
        &self,
        cursor: Option<&ScanCursor>,
        limit: usize,
    ) -> Result<ScanPage, StoreError>;
}

/// Object store serving the published site.
pub trait BlobStore: Send + Sync {
    /// Write an object, overwriting any previous content at `key`.
    fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StoreError>;

    /// Read an object.
    ///
    /// Returns `Ok(None)` if no object exists at `key`.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
}

/// At-least-once notification queue.
pub trait NotificationQueue: Send + Sync {
    /// Receive up to `max` messages without waiting.
    ///
    /// Received messages stay invisible for `visibility_timeout`; if they are
    /// not deleted in that window they are delivered again.
    fn receive(
        &self,
        max: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<Notification>, StoreError>;

    /// Delete delivered messages so they are not redelivered.
    fn delete_batch(&self, notifications: &[Notification]) -> Result<(), StoreError>;
}

/// Invalidation batch sent to the edge cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationRequest {
    /// Absolute paths (each starting with `/`), or exactly `["/*"]`.
    pub paths: Vec<String>,
    /// Correlation and idempotency token for the provider.
    pub caller_reference: String,
}

/// Edge cache in front of the blob store.
pub trait CacheInvalidator: Send + Sync {
    /// Submit an invalidation batch.
    ///
    /// Returns the provider's invalidation id.
    fn invalidate(&self, request: &InvalidationRequest) -> Result<String, StoreError>;
}
