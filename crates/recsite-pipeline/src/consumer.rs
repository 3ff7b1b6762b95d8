//! Incremental consumer draining the change notification queue.
//!
//! One cycle receives messages one at a time until the queue reports none
//! visible, runs a cascade for each, then deletes the handled messages in a
//! single batch and issues one cache invalidation for everything written.
//! Messages whose cascade failed are left undeleted and come back after the
//! visibility timeout.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use recsite_store::{ChangeNotice, Notification, NotificationQueue};

use crate::batcher::{FlushOutcome, InvalidationBatcher};
use crate::cascade::{Cascade, CascadeError, Inconsistency};
use crate::pending::PendingInvalidations;

/// Messages requested per receive call.
const RECEIVE_BATCH: usize = 1;

/// Default visibility timeout for received messages.
///
/// Handled messages are only deleted once the drain ends, so a drain that
/// outlasts this timeout sees them again. A message received twice in one
/// cycle ends the drain early; its latest receipt handle is used for the
/// delete.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(20);

/// Error handling a single notification.
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    #[error("Malformed notification {message_id}: {source}")]
    Parse {
        message_id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Cascade(#[from] CascadeError),
}

/// Summary of one consumer cycle.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub cycle_id: String,
    /// Messages received, including ones that failed.
    pub received: usize,
    /// Messages whose cascade completed.
    pub processed: usize,
    /// Messages left on the queue for redelivery.
    pub failed: usize,
    /// Messages deleted at the end of the cycle.
    pub deleted: usize,
    /// Messages received again within the cycle after their visibility
    /// timeout lapsed.
    pub redelivered: usize,
    pub inconsistencies: Vec<Inconsistency>,
    pub invalidation: Option<FlushOutcome>,
}

impl CycleReport {
    /// Whether the cycle found no messages at all.
    pub fn is_idle(&self) -> bool {
        self.received == 0
    }
}

/// Totals over [`Consumer::run`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunTotals {
    pub cycles: usize,
    pub processed: usize,
    pub failed: usize,
}

/// Queue-driven incremental regeneration.
pub struct Consumer {
    queue: Arc<dyn NotificationQueue>,
    cascade: Cascade,
    batcher: InvalidationBatcher,
    visibility_timeout: Duration,
}

impl Consumer {
    #[must_use]
    pub fn new(
        queue: Arc<dyn NotificationQueue>,
        cascade: Cascade,
        batcher: InvalidationBatcher,
    ) -> Self {
        Self {
            queue,
            cascade,
            batcher,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_visibility_timeout(mut self, timeout: Duration) -> Self {
        self.visibility_timeout = timeout;
        self
    }

    /// Run one cycle with a fresh cycle id.
    pub fn run_cycle(&self) -> CycleReport {
        let cycle_id = uuid::Uuid::new_v4().to_string();
        self.run_cycle_with_id(&cycle_id)
    }

    /// Run one cycle, using `cycle_id` for logging and as the invalidation
    /// caller reference.
    pub fn run_cycle_with_id(&self, cycle_id: &str) -> CycleReport {
        let _span = tracing::info_span!("cycle", cycle_id = %cycle_id).entered();
        let mut report = CycleReport {
            cycle_id: cycle_id.to_owned(),
            ..CycleReport::default()
        };
        let mut pending = PendingInvalidations::new();
        let mut handled: Vec<Notification> = Vec::new();
        let mut seen = HashSet::new();

        'drain: loop {
            let batch = match self.queue.receive(RECEIVE_BATCH, self.visibility_timeout) {
                Ok(batch) => batch,
                Err(e) => {
                    tracing::warn!(error = %e, "Receive failed, ending drain");
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }

            for notification in batch {
                if !seen.insert(notification.message_id.clone()) {
                    report.redelivered += 1;
                    tracing::warn!(
                        message_id = %notification.message_id,
                        visibility_timeout = ?self.visibility_timeout,
                        "Message redelivered within cycle, ending drain"
                    );
                    if let Some(previous) = handled
                        .iter_mut()
                        .find(|n| n.message_id == notification.message_id)
                    {
                        previous.receipt_handle = notification.receipt_handle;
                    }
                    break 'drain;
                }
                report.received += 1;
                match self.handle(&notification, &mut pending) {
                    Ok(inconsistencies) => {
                        report.processed += 1;
                        report.inconsistencies.extend(inconsistencies);
                        handled.push(notification);
                    }
                    Err(e) => {
                        report.failed += 1;
                        tracing::error!(
                            message_id = %notification.message_id,
                            error = %e,
                            "Notification failed, leaving for redelivery"
                        );
                    }
                }
            }
        }

        if !handled.is_empty() {
            match self.queue.delete_batch(&handled) {
                Ok(()) => report.deleted = handled.len(),
                Err(e) => {
                    tracing::warn!(count = handled.len(), error = %e, "Delete batch failed");
                }
            }
        }

        report.invalidation = self.batcher.flush(cycle_id, &mut pending);

        if !report.is_idle() {
            tracing::info!(
                received = report.received,
                redelivered = report.redelivered,
                processed = report.processed,
                failed = report.failed,
                deleted = report.deleted,
                inconsistencies = report.inconsistencies.len(),
                "Cycle complete"
            );
        }
        report
    }

    fn handle(
        &self,
        notification: &Notification,
        pending: &mut PendingInvalidations,
    ) -> Result<Vec<Inconsistency>, ConsumeError> {
        let notice: ChangeNotice =
            serde_json::from_str(&notification.body).map_err(|source| ConsumeError::Parse {
                message_id: notification.message_id.clone(),
                source,
            })?;

        let _span = tracing::info_span!(
            "notification",
            message_id = %notification.message_id,
            recording_id = %notice.recording_id,
        )
        .entered();
        tracing::info!(
            organization = %notice.organization,
            topic = %notice.meeting_topic,
            "Processing change"
        );

        let report = self.cascade.on_notice(&notice, pending)?;
        Ok(report.inconsistencies)
    }

    /// Run cycles until `max_cycles` is reached, or forever when `None`.
    ///
    /// Sleeps `idle_delay` after every cycle that received nothing. Errors are
    /// logged by the cycle and never end the loop.
    pub fn run(&self, idle_delay: Duration, max_cycles: Option<usize>) -> RunTotals {
        let mut totals = RunTotals::default();
        while max_cycles.is_none_or(|max| totals.cycles < max) {
            let report = self.run_cycle();
            totals.cycles += 1;
            totals.processed += report.processed;
            totals.failed += report.failed;

            let more = max_cycles.is_none_or(|max| totals.cycles < max);
            if report.is_idle() && more && !idle_delay.is_zero() {
                std::thread::sleep(idle_delay);
            }
        }
        totals
    }
}
