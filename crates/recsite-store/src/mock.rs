//! Mock collaborators for testing.
//!
//! Provides in-memory [`Catalog`], [`BlobStore`], [`NotificationQueue`], and
//! [`CacheInvalidator`] implementations with failure injection.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crate::model::{MeetingOccurrence, Notification};
use crate::store::{
    BlobStore, CacheInvalidator, Catalog, ErrorStatus, InvalidationRequest, NotificationQueue,
    ScanCursor, ScanPage, StoreError, StoreErrorKind,
};

/// Mock document store.
///
/// Records are kept sorted by `recording_id`. Records added with
/// [`MockCatalog::with_unindexed`] are visible to `get` and scans but missing
/// from the secondary indexes, the way a lagging index behaves.
///
/// # Example
///
/// ```ignore
/// let catalog = MockCatalog::new().with_occurrence(occurrence);
/// let found = catalog.query_by_topic("Weekly Sync").unwrap();
/// ```
#[derive(Debug, Default)]
pub struct MockCatalog {
    records: RwLock<BTreeMap<String, MeetingOccurrence>>,
    unindexed: RwLock<HashSet<String>>,
    missing_indexes: AtomicBool,
    fail_scan_after: RwLock<Option<usize>>,
    scan_calls: AtomicUsize,
}

impl MockCatalog {
    /// Create a new empty mock catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an occurrence visible everywhere.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_occurrence(self, occurrence: MeetingOccurrence) -> Self {
        self.insert(occurrence);
        self
    }

    /// Add an occurrence that the secondary indexes do not return.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_unindexed(self, occurrence: MeetingOccurrence) -> Self {
        self.unindexed
            .write()
            .unwrap()
            .insert(occurrence.recording_id.clone());
        self.insert(occurrence);
        self
    }

    /// Make index queries fail as if the indexes did not exist.
    #[must_use]
    pub fn with_missing_indexes(self) -> Self {
        self.missing_indexes.store(true, Ordering::SeqCst);
        self
    }

    /// Make scans fail once `pages` pages have been served.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_scan_failure_after(self, pages: usize) -> Self {
        *self.fail_scan_after.write().unwrap() = Some(pages);
        self
    }

    /// Insert or replace an occurrence.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn insert(&self, occurrence: MeetingOccurrence) {
        self.records
            .write()
            .unwrap()
            .insert(occurrence.recording_id.clone(), occurrence);
    }

    /// Snapshot of every record in key order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn all(&self) -> Vec<MeetingOccurrence> {
        self.records.read().unwrap().values().cloned().collect()
    }

    fn query(
        &self,
        index: &str,
        matches: impl Fn(&MeetingOccurrence) -> bool,
    ) -> Result<Vec<MeetingOccurrence>, StoreError> {
        if self.missing_indexes.load(Ordering::SeqCst) {
            return Err(StoreError::not_found(index).with_backend("Mock"));
        }
        let unindexed = self.unindexed.read().unwrap();
        Ok(self
            .records
            .read()
            .unwrap()
            .values()
            .filter(|o| !unindexed.contains(&o.recording_id) && matches(o))
            .cloned()
            .collect())
    }
}

impl Catalog for MockCatalog {
    fn get(&self, recording_id: &str) -> Result<Option<MeetingOccurrence>, StoreError> {
        Ok(self.records.read().unwrap().get(recording_id).cloned())
    }

    fn query_by_topic(&self, topic: &str) -> Result<Vec<MeetingOccurrence>, StoreError> {
        self.query("meeting-index", |o| o.meeting_topic == topic)
    }

    fn query_by_organization(
        &self,
        organization: &str,
    ) -> Result<Vec<MeetingOccurrence>, StoreError> {
        self.query("organization-index", |o| o.organization == organization)
    }

    fn scan_page(
        &self,
        cursor: Option<&ScanCursor>,
        limit: usize,
    ) -> Result<ScanPage, StoreError> {
        let served = self.scan_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .fail_scan_after
            .read()
            .unwrap()
            .is_some_and(|after| served >= after)
        {
            return Err(StoreError::new(StoreErrorKind::Unavailable)
                .with_status(ErrorStatus::Persistent)
                .with_backend("Mock"));
        }

        let records = self.records.read().unwrap();
        let mut remaining = records
            .iter()
            .filter(|(id, _)| cursor.is_none_or(|c| id.as_str() > c.0.as_str()))
            .peekable();

        let mut items = Vec::new();
        while items.len() < limit.max(1) {
            match remaining.next() {
                Some((_, occurrence)) => items.push(occurrence.clone()),
                None => break,
            }
        }
        let next = remaining
            .peek()
            .and_then(|_| items.last())
            .map(|last| ScanCursor(last.recording_id.clone()));

        Ok(ScanPage { items, next })
    }
}

/// Mock object store.
///
/// Records every successful write in order so tests can assert publish
/// ordering.
#[derive(Debug, Default)]
pub struct MockBlobStore {
    objects: RwLock<BTreeMap<String, (Vec<u8>, String)>>,
    writes: RwLock<Vec<String>>,
    failing_keys: RwLock<HashSet<String>>,
    unavailable: AtomicBool,
}

impl MockBlobStore {
    /// Create a new empty mock blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_object(self, key: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.objects
            .write()
            .unwrap()
            .insert(key.into(), (body.into(), "application/octet-stream".to_owned()));
        self
    }

    /// Make writes to `key` fail with permission denied.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_failing_key(self, key: impl Into<String>) -> Self {
        self.failing_keys.write().unwrap().insert(key.into());
        self
    }

    /// Toggle whether every call fails as unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Stored body as UTF-8 text.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn text(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .unwrap()
            .get(key)
            .map(|(body, _)| String::from_utf8_lossy(body).into_owned())
    }

    /// Content type of a stored object.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .unwrap()
            .get(key)
            .map(|(_, content_type)| content_type.clone())
    }

    /// Keys of successful writes, in write order (repeats included).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn writes(&self) -> Vec<String> {
        self.writes.read().unwrap().clone()
    }

    /// Every stored object as `key -> text`.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.objects
            .read()
            .unwrap()
            .iter()
            .map(|(key, (body, _))| (key.clone(), String::from_utf8_lossy(body).into_owned()))
            .collect()
    }

    fn check_available(&self, key: &str) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::new(StoreErrorKind::Unavailable)
                .with_status(ErrorStatus::Persistent)
                .with_key(key)
                .with_backend("Mock"));
        }
        Ok(())
    }
}

impl BlobStore for MockBlobStore {
    fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StoreError> {
        self.check_available(key)?;
        if self.failing_keys.read().unwrap().contains(key) {
            return Err(StoreError::new(StoreErrorKind::PermissionDenied)
                .with_key(key)
                .with_backend("Mock"));
        }
        self.objects
            .write()
            .unwrap()
            .insert(key.to_owned(), (body.to_vec(), content_type.to_owned()));
        self.writes.write().unwrap().push(key.to_owned());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.check_available(key)?;
        Ok(self
            .objects
            .read()
            .unwrap()
            .get(key)
            .map(|(body, _)| body.clone()))
    }
}

/// Mock at-least-once queue.
///
/// Received messages move to an in-flight list. Deleting removes them for
/// good; [`MockQueue::expire_visibility`] puts undeleted ones back, the way a
/// visibility timeout does.
#[derive(Debug, Default)]
pub struct MockQueue {
    visible: RwLock<VecDeque<Notification>>,
    in_flight: RwLock<Vec<Notification>>,
    deleted: RwLock<Vec<Notification>>,
    delete_calls: AtomicUsize,
    next_id: AtomicUsize,
    receive_failures: AtomicUsize,
    expire_countdown: AtomicUsize,
}

impl MockQueue {
    /// Create a new empty mock queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a message body.
    #[must_use]
    pub fn with_message(self, body: impl Into<String>) -> Self {
        self.send(body);
        self
    }

    /// Make the next `count` receive calls fail.
    #[must_use]
    pub fn with_receive_failures(self, count: usize) -> Self {
        self.receive_failures.store(count, Ordering::SeqCst);
        self
    }

    /// Let the visibility timeout lapse once, just before receive call
    /// `receives + 1`, returning every in-flight message to the queue.
    #[must_use]
    pub fn with_visibility_lapse_after(self, receives: usize) -> Self {
        self.expire_countdown.store(receives + 1, Ordering::SeqCst);
        self
    }

    /// Enqueue a message body, returning its message id.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn send(&self, body: impl Into<String>) -> String {
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        let message_id = format!("msg-{n}");
        self.visible.write().unwrap().push_back(Notification {
            message_id: message_id.clone(),
            receipt_handle: format!("rh-{n}"),
            body: body.into(),
        });
        message_id
    }

    /// Return every undeleted in-flight message to the visible queue.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn expire_visibility(&self) {
        let expired: Vec<_> = self.in_flight.write().unwrap().drain(..).collect();
        self.visible.write().unwrap().extend(expired);
    }

    /// Messages deleted so far, in deletion order.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn deleted_ids(&self) -> Vec<String> {
        self.deleted
            .read()
            .unwrap()
            .iter()
            .map(|n| n.message_id.clone())
            .collect()
    }

    /// Ids of messages received but not deleted.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn in_flight_ids(&self) -> Vec<String> {
        self.in_flight
            .read()
            .unwrap()
            .iter()
            .map(|n| n.message_id.clone())
            .collect()
    }

    /// Number of `delete_batch` calls.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Number of messages waiting to be received.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn visible_len(&self) -> usize {
        self.visible.read().unwrap().len()
    }
}

impl NotificationQueue for MockQueue {
    fn receive(
        &self,
        max: usize,
        _visibility_timeout: Duration,
    ) -> Result<Vec<Notification>, StoreError> {
        if self
            .receive_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::new(StoreErrorKind::Timeout)
                .with_status(ErrorStatus::Temporary)
                .with_backend("Mock"));
        }

        if self
            .expire_countdown
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            == Ok(1)
        {
            self.expire_visibility();
        }

        let mut visible = self.visible.write().unwrap();
        let take = max.min(visible.len());
        let received: Vec<_> = visible.drain(..take).collect();
        self.in_flight
            .write()
            .unwrap()
            .extend(received.iter().cloned());
        Ok(received)
    }

    fn delete_batch(&self, notifications: &[Notification]) -> Result<(), StoreError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut in_flight = self.in_flight.write().unwrap();
        let mut visible = self.visible.write().unwrap();
        let mut deleted = self.deleted.write().unwrap();
        for notification in notifications {
            let handle = &notification.receipt_handle;
            if let Some(pos) = in_flight.iter().position(|n| &n.receipt_handle == handle) {
                deleted.push(in_flight.remove(pos));
            } else if let Some(pos) = visible.iter().position(|n| &n.receipt_handle == handle) {
                // Deleting a message whose visibility lapsed still removes it
                if let Some(message) = visible.remove(pos) {
                    deleted.push(message);
                }
            }
        }
        Ok(())
    }
}

/// Mock edge cache.
#[derive(Debug, Default)]
pub struct MockInvalidator {
    requests: RwLock<Vec<InvalidationRequest>>,
    failing: AtomicBool,
}

impl MockInvalidator {
    /// Create a new mock invalidator that accepts every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every request fail.
    #[must_use]
    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    /// Requests received so far (failed ones included).
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn requests(&self) -> Vec<InvalidationRequest> {
        self.requests.read().unwrap().clone()
    }
}

impl CacheInvalidator for MockInvalidator {
    fn invalidate(&self, request: &InvalidationRequest) -> Result<String, StoreError> {
        let mut requests = self.requests.write().unwrap();
        requests.push(request.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::new(StoreErrorKind::RateLimited)
                .with_status(ErrorStatus::Persistent)
                .with_backend("Mock"));
        }
        Ok(format!("inv-{}", requests.len()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    fn occurrence(id: &str, topic: &str) -> MeetingOccurrence {
        MeetingOccurrence {
            recording_id: id.to_owned(),
            organization: "Acme".to_owned(),
            meeting_topic: topic.to_owned(),
            start_time: Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2024, 1, 1, 16, 0, 0).unwrap(),
            recording_path: None,
            files: Vec::new(),
        }
    }

    #[test]
    fn test_mocks_are_send_sync() {
        assert_send_sync::<MockCatalog>();
        assert_send_sync::<MockBlobStore>();
        assert_send_sync::<MockQueue>();
        assert_send_sync::<MockInvalidator>();
    }

    #[test]
    fn test_catalog_queries() {
        let catalog = MockCatalog::new()
            .with_occurrence(occurrence("a", "Sync"))
            .with_occurrence(occurrence("b", "Review"));

        assert_eq!(catalog.query_by_topic("Sync").unwrap().len(), 1);
        assert_eq!(catalog.query_by_organization("Acme").unwrap().len(), 2);
        assert!(catalog.query_by_topic("Other").unwrap().is_empty());
        assert!(catalog.get("b").unwrap().is_some());
        assert!(catalog.get("z").unwrap().is_none());
    }

    #[test]
    fn test_catalog_unindexed_visible_to_get_only() {
        let catalog = MockCatalog::new().with_unindexed(occurrence("a", "Sync"));

        assert!(catalog.get("a").unwrap().is_some());
        assert!(catalog.query_by_topic("Sync").unwrap().is_empty());
        assert_eq!(catalog.scan_page(None, 10).unwrap().items.len(), 1);
    }

    #[test]
    fn test_catalog_missing_indexes() {
        let catalog = MockCatalog::new().with_missing_indexes();

        let err = catalog.query_by_topic("Sync").unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::NotFound);
    }

    #[test]
    fn test_catalog_scan_pages() {
        let catalog = MockCatalog::new()
            .with_occurrence(occurrence("a", "Sync"))
            .with_occurrence(occurrence("b", "Sync"))
            .with_occurrence(occurrence("c", "Sync"));

        let first = catalog.scan_page(None, 2).unwrap();
        assert_eq!(first.items.len(), 2);
        let cursor = first.next.unwrap();
        assert_eq!(cursor, ScanCursor("b".to_owned()));

        let second = catalog.scan_page(Some(&cursor), 2).unwrap();
        assert_eq!(second.items.len(), 1);
        assert_eq!(second.items[0].recording_id, "c");
        assert!(second.next.is_none());
    }

    #[test]
    fn test_catalog_scan_exact_page_has_no_cursor() {
        let catalog = MockCatalog::new()
            .with_occurrence(occurrence("a", "Sync"))
            .with_occurrence(occurrence("b", "Sync"));

        let page = catalog.scan_page(None, 2).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.next.is_none());
    }

    #[test]
    fn test_blob_store_records_writes() {
        let store = MockBlobStore::new();
        store.put("a/index.html", b"one", "text/html").unwrap();
        store.put("a/index.html", b"two", "text/html").unwrap();

        assert_eq!(store.text("a/index.html").as_deref(), Some("two"));
        assert_eq!(store.content_type("a/index.html").as_deref(), Some("text/html"));
        assert_eq!(store.writes(), vec!["a/index.html", "a/index.html"]);
    }

    #[test]
    fn test_blob_store_failing_key() {
        let store = MockBlobStore::new().with_failing_key("a/index.html");

        let err = store.put("a/index.html", b"x", "text/html").unwrap_err();
        assert_eq!(err.kind, StoreErrorKind::PermissionDenied);
        assert!(store.writes().is_empty());
    }

    #[test]
    fn test_queue_redelivers_undeleted() {
        let queue = MockQueue::new().with_message("one").with_message("two");

        let first = queue.receive(1, Duration::from_secs(20)).unwrap();
        let second = queue.receive(1, Duration::from_secs(20)).unwrap();
        queue.delete_batch(&first).unwrap();
        assert!(queue.receive(1, Duration::from_secs(20)).unwrap().is_empty());

        queue.expire_visibility();
        let again = queue.receive(1, Duration::from_secs(20)).unwrap();
        assert_eq!(again, second);
        assert_eq!(queue.deleted_ids(), vec!["msg-0"]);
    }

    #[test]
    fn test_queue_visibility_lapse_mid_drain() {
        let queue = MockQueue::new()
            .with_message("one")
            .with_message("two")
            .with_visibility_lapse_after(2);

        let first = queue.receive(1, Duration::from_secs(20)).unwrap();
        queue.receive(1, Duration::from_secs(20)).unwrap();
        let third = queue.receive(1, Duration::from_secs(20)).unwrap();

        assert_eq!(third, first);
        assert_eq!(queue.visible_len(), 1);

        // Every later receive sees a normal queue
        queue.delete_batch(&first).unwrap();
        assert_eq!(queue.receive(1, Duration::from_secs(20)).unwrap().len(), 1);
        assert!(queue.receive(1, Duration::from_secs(20)).unwrap().is_empty());
        assert_eq!(queue.deleted_ids(), vec!["msg-0"]);
    }

    #[test]
    fn test_queue_receive_failures() {
        let queue = MockQueue::new().with_message("one").with_receive_failures(1);

        assert!(queue.receive(1, Duration::ZERO).is_err());
        assert_eq!(queue.receive(1, Duration::ZERO).unwrap().len(), 1);
    }

    #[test]
    fn test_invalidator_failing_still_records() {
        let invalidator = MockInvalidator::new().failing();
        let request = InvalidationRequest {
            paths: vec!["/*".to_owned()],
            caller_reference: "cycle-1".to_owned(),
        };

        assert!(invalidator.invalidate(&request).is_err());
        assert_eq!(invalidator.requests(), vec![request]);
    }
}
