//! Writes rendered pages to the blob store.

use std::sync::Arc;

use recsite_render::RenderedPage;
use recsite_store::{BlobStore, StoreError};

use crate::pending::PendingInvalidations;

/// Object name every page is stored under within its path.
pub const INDEX_FILE: &str = "index.html";

/// Content type of published pages.
pub const CONTENT_TYPE: &str = "text/html";

/// Error returned when a page cannot be written.
#[derive(Debug, thiserror::Error)]
#[error("Failed to publish {key}: {source}")]
pub struct PublishError {
    pub key: String,
    #[source]
    pub source: StoreError,
}

/// Object key for a canonical page path (`acme` -> `acme/index.html`).
pub fn page_key(path: &str) -> String {
    if path.is_empty() {
        return INDEX_FILE.to_owned();
    }
    format!("{path}/{INDEX_FILE}")
}

/// Publishes rendered markup and records what changed.
pub struct PagePublisher {
    store: Arc<dyn BlobStore>,
}

impl PagePublisher {
    #[must_use]
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self { store }
    }

    /// Write `markup` to `{path}/index.html`, overwriting any previous page.
    ///
    /// On success the key is recorded in `pending` and returned. A failed
    /// write records nothing.
    pub fn publish(
        &self,
        path: &str,
        markup: &str,
        pending: &mut PendingInvalidations,
    ) -> Result<String, PublishError> {
        let key = page_key(path);
        if let Err(source) = self.store.put(&key, markup.as_bytes(), CONTENT_TYPE) {
            tracing::error!(key = %key, error = %source, "Put page failed");
            return Err(PublishError { key, source });
        }
        tracing::debug!(key = %key, bytes = markup.len(), "Put page");
        pending.push(key.clone());
        Ok(key)
    }

    /// Publish a rendered page at its canonical path.
    pub fn publish_page(
        &self,
        page: &RenderedPage,
        pending: &mut PendingInvalidations,
    ) -> Result<String, PublishError> {
        self.publish(&page.path, &page.markup, pending)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use recsite_store::{MockBlobStore, StoreErrorKind};

    use super::*;

    #[test]
    fn test_page_key() {
        assert_eq!(page_key("acme/weekly-sync"), "acme/weekly-sync/index.html");
        assert_eq!(page_key(""), "index.html");
    }

    #[test]
    fn test_publish_writes_and_records() {
        let store = Arc::new(MockBlobStore::new());
        let publisher = PagePublisher::new(store.clone());
        let mut pending = PendingInvalidations::new();

        let key = publisher
            .publish("acme", "<h1>Acme</h1>", &mut pending)
            .unwrap();

        assert_eq!(key, "acme/index.html");
        assert_eq!(store.text("acme/index.html").as_deref(), Some("<h1>Acme</h1>"));
        assert_eq!(
            store.content_type("acme/index.html").as_deref(),
            Some("text/html")
        );
        assert_eq!(pending.keys(), ["acme/index.html"]);
    }

    #[test]
    fn test_publish_overwrites() {
        let store = Arc::new(MockBlobStore::new().with_object("acme/index.html", "old"));
        let publisher = PagePublisher::new(store.clone());
        let mut pending = PendingInvalidations::new();

        publisher.publish("acme", "new", &mut pending).unwrap();

        assert_eq!(store.text("acme/index.html").as_deref(), Some("new"));
    }

    #[test]
    fn test_failed_publish_records_nothing() {
        let store = Arc::new(MockBlobStore::new().with_failing_key("acme/index.html"));
        let publisher = PagePublisher::new(store);
        let mut pending = PendingInvalidations::new();

        let err = publisher.publish("acme", "x", &mut pending).unwrap_err();

        assert_eq!(err.key, "acme/index.html");
        assert_eq!(err.source.kind, StoreErrorKind::PermissionDenied);
        assert!(pending.is_empty());
    }
}
