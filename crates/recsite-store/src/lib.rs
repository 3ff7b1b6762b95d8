//! Meeting catalog model and collaborator interfaces.
//!
//! The publishing pipeline talks to four external systems, each behind a
//! trait so that the pipeline can run against in-memory doubles in tests and
//! against AWS in production:
//!
//! - [`Catalog`] - document store holding meeting records and their indexes
//! - [`BlobStore`] - object store serving the rendered pages
//! - [`NotificationQueue`] - at-least-once change notifications
//! - [`CacheInvalidator`] - edge cache in front of the blob store
//!
//! All traits are synchronous and `Send + Sync`. Backends that speak async
//! protocols bridge onto their own runtime.
//!
//! Mock implementations live behind the `mock` feature.

#[cfg(feature = "mock")]
mod mock;
mod model;
mod store;

#[cfg(feature = "mock")]
pub use mock::{MockBlobStore, MockCatalog, MockInvalidator, MockQueue};
pub use model::{ChangeNotice, MeetingOccurrence, Notification, RecordingFile};
pub use store::{
    BlobStore, CacheInvalidator, Catalog, ErrorStatus, InvalidationRequest, NotificationQueue,
    ScanCursor, ScanPage, StoreError, StoreErrorKind,
};
