//! Edge cache invalidation for the pages changed in one cycle.

use std::sync::Arc;

use recsite_store::{CacheInvalidator, InvalidationRequest};

use crate::pending::PendingInvalidations;

/// Distinct keys at which a batch collapses into a full invalidation.
pub const DEFAULT_THRESHOLD: usize = 10;

/// Path invalidating every cached object.
pub const WILDCARD: &str = "/*";

/// Result of a flush that sent a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushOutcome {
    pub request: InvalidationRequest,
    /// Provider invalidation id, `None` if the request failed.
    pub invalidation_id: Option<String>,
}

/// Turns a cycle's pending keys into at most one invalidation request.
pub struct InvalidationBatcher {
    invalidator: Arc<dyn CacheInvalidator>,
    threshold: usize,
}

impl InvalidationBatcher {
    #[must_use]
    pub fn new(invalidator: Arc<dyn CacheInvalidator>) -> Self {
        Self {
            invalidator,
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Override the wildcard threshold (values below 1 are treated as 1).
    #[must_use]
    pub fn with_threshold(mut self, threshold: usize) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    /// Drain `pending` into a request without sending it.
    ///
    /// Fewer than `threshold` distinct keys are invalidated individually as
    /// absolute paths; otherwise the request is exactly `["/*"]`. Returns
    /// `None` if nothing is pending.
    pub fn build_request(
        &self,
        cycle_id: &str,
        pending: &mut PendingInvalidations,
    ) -> Option<InvalidationRequest> {
        let keys = pending.take_distinct();
        if keys.is_empty() {
            return None;
        }
        let paths = if keys.len() < self.threshold {
            keys.iter().map(|key| format!("/{key}")).collect()
        } else {
            vec![WILDCARD.to_owned()]
        };
        Some(InvalidationRequest {
            paths,
            caller_reference: cycle_id.to_owned(),
        })
    }

    /// Drain `pending` and submit the resulting request.
    ///
    /// The set is cleared whether or not the request succeeds. Failures are
    /// logged and reported through [`FlushOutcome::invalidation_id`].
    pub fn flush(
        &self,
        cycle_id: &str,
        pending: &mut PendingInvalidations,
    ) -> Option<FlushOutcome> {
        let request = self.build_request(cycle_id, pending)?;
        let invalidation_id = match self.invalidator.invalidate(&request) {
            Ok(id) => {
                tracing::info!(
                    cycle_id = %cycle_id,
                    invalidation_id = %id,
                    paths = request.paths.len(),
                    "Created cache invalidation"
                );
                Some(id)
            }
            Err(e) => {
                tracing::error!(
                    cycle_id = %cycle_id,
                    paths = ?request.paths,
                    error = %e,
                    "Cache invalidation failed"
                );
                None
            }
        };
        Some(FlushOutcome {
            request,
            invalidation_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use recsite_store::MockInvalidator;

    use super::*;

    fn pending_with(count: usize) -> PendingInvalidations {
        let mut pending = PendingInvalidations::new();
        for i in 0..count {
            pending.push(format!("acme/topic-{i}/index.html"));
        }
        pending
    }

    #[test]
    fn test_nine_paths_sent_individually() {
        let batcher = InvalidationBatcher::new(Arc::new(MockInvalidator::new()));
        let mut pending = pending_with(9);

        let request = batcher.build_request("cycle-1", &mut pending).unwrap();

        assert_eq!(request.paths.len(), 9);
        assert_eq!(request.paths[0], "/acme/topic-0/index.html");
        assert_eq!(request.caller_reference, "cycle-1");
    }

    #[test]
    fn test_ten_paths_collapse_to_wildcard() {
        let batcher = InvalidationBatcher::new(Arc::new(MockInvalidator::new()));
        let mut pending = pending_with(10);

        let request = batcher.build_request("cycle-1", &mut pending).unwrap();

        assert_eq!(request.paths, vec!["/*"]);
    }

    #[test]
    fn test_duplicates_counted_once() {
        let batcher = InvalidationBatcher::new(Arc::new(MockInvalidator::new()));
        let mut pending = pending_with(9);
        pending.push("acme/topic-0/index.html");
        pending.push("acme/topic-1/index.html");

        let request = batcher.build_request("cycle-1", &mut pending).unwrap();

        assert_eq!(request.paths.len(), 9);
    }

    #[test]
    fn test_empty_sends_nothing() {
        let invalidator = Arc::new(MockInvalidator::new());
        let batcher =
            InvalidationBatcher::new(Arc::clone(&invalidator) as Arc<dyn CacheInvalidator>);

        assert!(batcher
            .flush("cycle-1", &mut PendingInvalidations::new())
            .is_none());
        assert!(invalidator.requests().is_empty());
    }

    #[test]
    fn test_flush_sends_and_clears() {
        let invalidator = Arc::new(MockInvalidator::new());
        let batcher =
            InvalidationBatcher::new(Arc::clone(&invalidator) as Arc<dyn CacheInvalidator>);
        let mut pending = pending_with(2);

        let outcome = batcher.flush("cycle-1", &mut pending).unwrap();

        assert_eq!(outcome.invalidation_id.as_deref(), Some("inv-1"));
        assert_eq!(invalidator.requests(), vec![outcome.request]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_failed_flush_still_clears() {
        let invalidator = Arc::new(MockInvalidator::new().failing());
        let batcher =
            InvalidationBatcher::new(Arc::clone(&invalidator) as Arc<dyn CacheInvalidator>);
        let mut pending = pending_with(3);

        let outcome = batcher.flush("cycle-1", &mut pending).unwrap();

        assert!(outcome.invalidation_id.is_none());
        assert_eq!(invalidator.requests().len(), 1);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_custom_threshold() {
        let batcher =
            InvalidationBatcher::new(Arc::new(MockInvalidator::new())).with_threshold(2);

        let request = batcher.build_request("c", &mut pending_with(2)).unwrap();

        assert_eq!(request.paths, vec![WILDCARD]);
    }
}
