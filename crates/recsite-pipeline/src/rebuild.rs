//! Full site rebuild from a catalog scan.
//!
//! Every meeting page is republished straight from the scan results, while
//! the organizations and topics seen are collected. Topic and organization
//! pages are then regenerated through the same queries the incremental path
//! uses, so both paths converge on identical pages.

use std::collections::{BTreeMap, BTreeSet};

use recsite_render::PageKind;
use recsite_store::{ScanCursor, StoreError};

use crate::batcher::{FlushOutcome, InvalidationBatcher};
use crate::cascade::{Cascade, CascadeError, Inconsistency};
use crate::pending::PendingInvalidations;

/// Default number of records requested per scan page.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Summary of a rebuild.
#[derive(Debug, Default)]
pub struct RebuildReport {
    pub cycle_id: String,
    /// Scan pages fetched.
    pub scan_pages: usize,
    /// Records returned by the scan.
    pub scanned: usize,
    pub meeting_pages: usize,
    pub topic_pages: usize,
    pub organization_pages: usize,
    /// Pages that failed to render or publish.
    pub failures: usize,
    pub inconsistencies: Vec<Inconsistency>,
    pub invalidation: Option<FlushOutcome>,
}

/// Error that ended catalog discovery early.
///
/// Pages for everything discovered before the failure were still regenerated
/// and invalidated; `report` describes that work.
#[derive(Debug, thiserror::Error)]
#[error("Catalog scan failed after {} pages: {source}", report.scan_pages)]
pub struct RebuildError {
    pub report: Box<RebuildReport>,
    #[source]
    pub source: StoreError,
}

/// Rebuilds every page of the site.
pub struct RebuildDriver {
    cascade: Cascade,
    batcher: InvalidationBatcher,
    page_size: usize,
}

impl RebuildDriver {
    #[must_use]
    pub fn new(cascade: Cascade, batcher: InvalidationBatcher) -> Self {
        Self {
            cascade,
            batcher,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Set the scan page size (values below 1 are treated as 1).
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Rebuild with a fresh cycle id.
    pub fn rebuild_all(&self) -> Result<RebuildReport, RebuildError> {
        let cycle_id = uuid::Uuid::new_v4().to_string();
        self.rebuild_with_id(&cycle_id)
    }

    /// Rebuild, using `cycle_id` for logging and as the invalidation caller
    /// reference.
    pub fn rebuild_with_id(&self, cycle_id: &str) -> Result<RebuildReport, RebuildError> {
        let _span = tracing::info_span!("cycle", cycle_id = %cycle_id, mode = "rebuild").entered();
        let mut report = RebuildReport {
            cycle_id: cycle_id.to_owned(),
            ..RebuildReport::default()
        };
        let mut pending = PendingInvalidations::new();

        let (discovered, scan_error) = self.discover(&mut report, &mut pending);
        tracing::info!(
            organizations = discovered.len(),
            scanned = report.scanned,
            "Discovery complete"
        );

        for (organization, topics) in &discovered {
            for topic in topics {
                let result = self.cascade.regenerate_topic(organization, topic, &mut pending);
                record(&mut report, PageKind::Topic, topic, result);
            }
            let result = self
                .cascade
                .regenerate_organization(organization, &mut pending);
            record(&mut report, PageKind::Organization, organization, result);
        }

        report.invalidation = self.batcher.flush(cycle_id, &mut pending);

        tracing::info!(
            meeting_pages = report.meeting_pages,
            topic_pages = report.topic_pages,
            organization_pages = report.organization_pages,
            failures = report.failures,
            inconsistencies = report.inconsistencies.len(),
            "Rebuild complete"
        );

        match scan_error {
            Some(source) => Err(RebuildError {
                report: Box::new(report),
                source,
            }),
            None => Ok(report),
        }
    }

    /// Scan the whole catalog, publishing meeting pages as records arrive.
    ///
    /// Returns `organization -> topics` for everything seen, plus the scan
    /// error that stopped discovery early, if any.
    fn discover(
        &self,
        report: &mut RebuildReport,
        pending: &mut PendingInvalidations,
    ) -> (BTreeMap<String, BTreeSet<String>>, Option<StoreError>) {
        let mut discovered: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        let mut cursor: Option<ScanCursor> = None;

        loop {
            let page = match self.cascade.catalog().scan_page(cursor.as_ref(), self.page_size) {
                Ok(page) => page,
                Err(e) => {
                    tracing::error!(pages = report.scan_pages, error = %e, "Catalog scan failed");
                    return (discovered, Some(e));
                }
            };
            report.scan_pages += 1;
            report.scanned += page.items.len();
            tracing::debug!(
                page = report.scan_pages,
                items = page.items.len(),
                "Scanned catalog page"
            );

            for occurrence in &page.items {
                match self.cascade.publish_meeting(occurrence, pending) {
                    Ok(_) => report.meeting_pages += 1,
                    Err(e) => {
                        report.failures += 1;
                        tracing::error!(
                            recording_id = %occurrence.recording_id,
                            error = %e,
                            "Meeting page failed"
                        );
                    }
                }
                discovered
                    .entry(occurrence.organization.clone())
                    .or_default()
                    .insert(occurrence.meeting_topic.clone());
            }

            match page.next {
                Some(next) => cursor = Some(next),
                None => return (discovered, None),
            }
        }
    }
}

fn record(
    report: &mut RebuildReport,
    kind: PageKind,
    lookup: &str,
    result: Result<Option<String>, CascadeError>,
) {
    match result {
        Ok(Some(_)) => match kind {
            PageKind::Topic => report.topic_pages += 1,
            PageKind::Organization => report.organization_pages += 1,
            PageKind::Meeting => report.meeting_pages += 1,
        },
        Ok(None) => report.inconsistencies.push(Inconsistency {
            kind,
            lookup: lookup.to_owned(),
            recording_id: None,
        }),
        Err(e) => {
            report.failures += 1;
            tracing::error!(kind = %kind, lookup = %lookup, error = %e, "Page regeneration failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use recsite_store::{
        CacheInvalidator, MockBlobStore, MockCatalog, MockInvalidator, MockQueue,
        NotificationQueue,
    };

    use super::*;
    use crate::consumer::Consumer;
    use crate::testing::{cascade, notice_body, occurrence};

    fn sample_catalog() -> MockCatalog {
        MockCatalog::new()
            .with_occurrence(occurrence(
                "rec-1",
                "Acme",
                "Weekly Sync (Acme)",
                "2024-01-01T15:02:31Z",
            ))
            .with_occurrence(occurrence(
                "rec-2",
                "Acme",
                "Weekly Sync (Acme)",
                "2024-01-08T15:00:00Z",
            ))
            .with_occurrence(occurrence(
                "rec-3",
                "Acme",
                "Board Meeting",
                "2024-01-03T20:00:00Z",
            ))
            .with_occurrence(occurrence(
                "rec-4",
                "Globex",
                "Planning",
                "2024-02-01T14:30:00Z",
            ))
            .with_occurrence(occurrence(
                "rec-5",
                "Globex",
                "Weekly Sync (Acme)",
                "2024-02-02T14:30:00Z",
            ))
    }

    fn build_driver(
        catalog: MockCatalog,
        store: &Arc<MockBlobStore>,
    ) -> (RebuildDriver, Arc<MockInvalidator>) {
        let invalidator = Arc::new(MockInvalidator::new());
        let driver = RebuildDriver::new(
            cascade(catalog, store),
            InvalidationBatcher::new(Arc::clone(&invalidator) as Arc<dyn CacheInvalidator>),
        );
        (driver, invalidator)
    }

    #[test]
    fn test_rebuild_publishes_every_page() {
        let store = Arc::new(MockBlobStore::new());
        let (driver, invalidator) = build_driver(sample_catalog(), &store);

        let report = driver.rebuild_with_id("rebuild-1").unwrap();

        assert_eq!(report.scanned, 5);
        assert_eq!(report.meeting_pages, 5);
        assert_eq!(report.topic_pages, 4);
        assert_eq!(report.organization_pages, 2);
        assert_eq!(report.failures, 0);
        assert!(store.text("globex/weekly-sync-acme/index.html").is_some());
        // 11 distinct pages collapse into a full invalidation
        let requests = invalidator.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].paths, vec!["/*"]);
        assert_eq!(requests[0].caller_reference, "rebuild-1");
    }

    #[test]
    fn test_scan_follows_cursor_across_pages() {
        let store = Arc::new(MockBlobStore::new());
        let catalog = sample_catalog();
        let (driver, _) = build_driver(catalog, &store);
        let driver = driver.with_page_size(2);

        let report = driver.rebuild_all().unwrap();

        assert_eq!(report.scan_pages, 3);
        assert_eq!(report.scanned, 5);
    }

    #[test]
    fn test_scan_failure_completes_discovered_pages() {
        let store = Arc::new(MockBlobStore::new());
        let (driver, invalidator) =
            build_driver(sample_catalog().with_scan_failure_after(1), &store);
        let driver = driver.with_page_size(2);

        let err = driver.rebuild_all().unwrap_err();

        // First page held rec-1 and rec-2: both meetings, their topic, and Acme
        assert_eq!(err.report.scan_pages, 1);
        assert_eq!(err.report.meeting_pages, 2);
        assert_eq!(err.report.topic_pages, 1);
        assert_eq!(err.report.organization_pages, 1);
        assert_eq!(invalidator.requests()[0].paths.len(), 4);
        assert!(store.text("globex/index.html").is_none());
    }

    #[test]
    fn test_per_item_failure_is_not_fatal() {
        let store =
            Arc::new(MockBlobStore::new().with_failing_key("acme/board-meeting/index.html"));
        let (driver, _) = build_driver(sample_catalog(), &store);

        let report = driver.rebuild_all().unwrap();

        assert_eq!(report.failures, 1);
        assert_eq!(report.topic_pages, 3);
        assert!(store.text("acme/index.html").is_some());
    }

    #[test]
    fn test_unindexed_records_are_inconsistencies() {
        let store = Arc::new(MockBlobStore::new());
        let catalog = MockCatalog::new().with_unindexed(occurrence(
            "rec-1",
            "Acme",
            "Planning",
            "2024-01-01T15:00:00Z",
        ));
        let (driver, _) = build_driver(catalog, &store);

        let report = driver.rebuild_all().unwrap();

        assert_eq!(report.meeting_pages, 1);
        let kinds: Vec<PageKind> = report.inconsistencies.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![PageKind::Topic, PageKind::Organization]);
    }

    #[test]
    fn test_rebuild_matches_incremental() {
        let rebuilt = Arc::new(MockBlobStore::new());
        let (driver, _) = build_driver(sample_catalog(), &rebuilt);
        driver.rebuild_all().unwrap();

        let incremental = Arc::new(MockBlobStore::new());
        let catalog = sample_catalog();
        let queue = Arc::new(MockQueue::new());
        for record in catalog.all() {
            queue.send(notice_body(
                &record.recording_id,
                &record.organization,
                &record.meeting_topic,
            ));
        }
        let consumer = Consumer::new(
            Arc::clone(&queue) as Arc<dyn NotificationQueue>,
            cascade(catalog, &incremental),
            InvalidationBatcher::new(Arc::new(MockInvalidator::new())),
        );
        consumer.run_cycle();

        assert_eq!(incremental.snapshot(), rebuilt.snapshot());
    }

    #[test]
    fn test_empty_catalog() {
        let store = Arc::new(MockBlobStore::new());
        let (driver, invalidator) = build_driver(MockCatalog::new(), &store);

        let report = driver.rebuild_all().unwrap();

        assert_eq!(report.scan_pages, 1);
        assert!(report.invalidation.is_none());
        assert!(invalidator.requests().is_empty());
    }
}
