//! Per-cycle accumulator of changed page keys.

use std::collections::HashSet;

/// Page keys written during one cycle, awaiting cache invalidation.
///
/// Owned by the cycle that fills it and passed down by `&mut`. Keys are
/// appended as pages are published; duplicates are removed only when the set
/// is drained.
#[derive(Debug, Default)]
pub struct PendingInvalidations {
    keys: Vec<String>,
}

impl PendingInvalidations {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a published page key.
    pub fn push(&mut self, key: impl Into<String>) {
        self.keys.push(key.into());
    }

    /// Number of recorded keys, duplicates included.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Recorded keys in insertion order, duplicates included.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Drain the set, returning each key once in first-seen order.
    pub fn take_distinct(&mut self) -> Vec<String> {
        let mut seen = HashSet::new();
        std::mem::take(&mut self.keys)
            .into_iter()
            .filter(|key| seen.insert(key.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_push_keeps_duplicates() {
        let mut pending = PendingInvalidations::new();
        pending.push("acme/index.html");
        pending.push("acme/index.html");

        assert_eq!(pending.len(), 2);
    }

    #[test]
    fn test_take_distinct_keeps_first_seen_order() {
        let mut pending = PendingInvalidations::new();
        for key in ["b/index.html", "a/index.html", "b/index.html", "c/index.html"] {
            pending.push(key);
        }

        assert_eq!(
            pending.take_distinct(),
            vec!["b/index.html", "a/index.html", "c/index.html"]
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn test_take_distinct_on_empty() {
        let mut pending = PendingInvalidations::new();

        assert!(pending.take_distinct().is_empty());
    }
}
