//! Change notification queue adapter.

use std::time::Duration;

use aws_sdk_sqs::Client;
use aws_sdk_sqs::types::DeleteMessageBatchRequestEntry;
use recsite_store::{Notification, NotificationQueue, StoreError, StoreErrorKind};

use crate::error::{error_chain, sdk_error};
use crate::{AwsContext, missing_field};

const BACKEND: &str = "SQS";

/// Most entries SQS accepts in one batch call.
const MAX_BATCH: usize = 10;

/// [`NotificationQueue`] backed by an SQS queue.
pub struct SqsQueue {
    ctx: AwsContext,
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    /// Use the queue at `queue_url`.
    pub fn new(ctx: &AwsContext, queue_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(ctx.sdk_config()),
            ctx: ctx.clone(),
            queue_url: queue_url.into(),
        }
    }

    /// Resolve the URL of a queue by name and owning account.
    pub fn from_name(ctx: &AwsContext, name: &str, account_id: &str) -> Result<Self, StoreError> {
        let client = Client::new(ctx.sdk_config());
        let mut request = client.get_queue_url().queue_name(name);
        if !account_id.is_empty() {
            request = request.queue_owner_aws_account_id(account_id);
        }
        let output = ctx
            .block_on(request.send())
            .map_err(|e| sdk_error(BACKEND, &e).with_key(name))?;
        let queue_url = output
            .queue_url
            .ok_or_else(|| missing_field(BACKEND, "QueueUrl"))?;
        tracing::debug!(queue = %name, url = %queue_url, "Resolved queue URL");

        Ok(Self {
            ctx: ctx.clone(),
            client,
            queue_url,
        })
    }

    /// URL of the queue in use.
    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

impl NotificationQueue for SqsQueue {
    fn receive(
        &self,
        max: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<Notification>, StoreError> {
        let output = self
            .ctx
            .block_on(
                self.client
                    .receive_message()
                    .queue_url(&self.queue_url)
                    .max_number_of_messages(clamp_i32(max.clamp(1, MAX_BATCH)))
                    .visibility_timeout(clamp_i32(visibility_timeout.as_secs()))
                    .wait_time_seconds(0)
                    .send(),
            )
            .map_err(|e| sdk_error(BACKEND, &e).with_key(&self.queue_url))?;

        let notifications = output
            .messages
            .unwrap_or_default()
            .into_iter()
            .filter_map(|message| {
                let Some(receipt_handle) = message.receipt_handle else {
                    tracing::warn!(
                        message_id = ?message.message_id,
                        "Message without receipt handle"
                    );
                    return None;
                };
                Some(Notification {
                    message_id: message.message_id.unwrap_or_default(),
                    receipt_handle,
                    body: message.body.unwrap_or_default(),
                })
            })
            .collect();
        Ok(notifications)
    }

    fn delete_batch(&self, notifications: &[Notification]) -> Result<(), StoreError> {
        for chunk in notifications.chunks(MAX_BATCH) {
            let entries = chunk
                .iter()
                .enumerate()
                .map(|(i, n)| {
                    DeleteMessageBatchRequestEntry::builder()
                        .id(format!("m{i}"))
                        .receipt_handle(&n.receipt_handle)
                        .build()
                        .map_err(|e| {
                            StoreError::new(StoreErrorKind::Other)
                                .with_backend(BACKEND)
                                .with_message(error_chain(&e))
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let output = self
                .ctx
                .block_on(
                    self.client
                        .delete_message_batch()
                        .queue_url(&self.queue_url)
                        .set_entries(Some(entries))
                        .send(),
                )
                .map_err(|e| sdk_error(BACKEND, &e).with_key(&self.queue_url))?;

            let failed = output.failed();
            if !failed.is_empty() {
                return Err(StoreError::new(StoreErrorKind::Other)
                    .with_backend(BACKEND)
                    .with_key(&self.queue_url)
                    .with_message(format!("{} of {} deletes failed", failed.len(), chunk.len())));
            }
            tracing::debug!(count = chunk.len(), "Deleted messages");
        }
        Ok(())
    }
}

fn clamp_i32<T: TryInto<i32>>(value: T) -> i32 {
    value.try_into().unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_i32() {
        assert_eq!(clamp_i32(20_u64), 20);
        assert_eq!(clamp_i32(u64::MAX), i32::MAX);
    }
}
