//! Incremental regeneration and cache invalidation for the recordings site.
//!
//! The site mirrors a catalog of recorded meetings as a three-level page
//! hierarchy (organization, topic, meeting). This crate keeps the published
//! pages and the edge cache in front of them consistent with the catalog:
//!
//! - [`PagePublisher`] writes rendered pages and records their keys
//! - [`Cascade`] regenerates a meeting page and its parents, bottom-up
//! - [`InvalidationBatcher`] turns a cycle's changed keys into one request
//! - [`Consumer`] drains the change notification queue cycle by cycle
//! - [`RebuildDriver`] republishes the whole site from a catalog scan
//!
//! Changed keys are collected in a [`PendingInvalidations`] value owned by
//! each cycle. Nothing in the pipeline is global state, so independent
//! cycles never share or leak pending work.

mod batcher;
mod cascade;
mod consumer;
mod pending;
mod publisher;
mod rebuild;
#[cfg(test)]
mod testing;

pub use batcher::{DEFAULT_THRESHOLD, FlushOutcome, InvalidationBatcher, WILDCARD};
pub use cascade::{Cascade, CascadeError, CascadeReport, Inconsistency};
pub use consumer::{ConsumeError, Consumer, CycleReport, DEFAULT_VISIBILITY_TIMEOUT, RunTotals};
pub use pending::PendingInvalidations;
pub use publisher::{CONTENT_TYPE, INDEX_FILE, PagePublisher, PublishError, page_key};
pub use rebuild::{DEFAULT_PAGE_SIZE, RebuildDriver, RebuildError, RebuildReport};
