use chrono::{DateTime, Duration, Utc};
use tracing::{error, info, warn};

use crate::domain::repository::{
    DeliveryLogRepository, DeliveryTransport, QueueRepository, ScheduleRepository,
};
use crate::domain::types::{NewDeliveryLog, OutboundMessage, QueueEntry, ScheduleStatus};
use crate::error::OutreachServiceError;
use crate::usecase::schedule::DEFAULT_PRIORITY;

/// Drains the delivery queue: claims due entries, pushes them through the
/// transport, records every attempt, and moves schedule/entry statuses.
///
/// Safe to run from several processes at once; the conditional-update claim
/// in the queue repository guarantees each entry has a single owner.
pub struct DeliveryWorker<S, Q, L, T>
where
    S: ScheduleRepository,
    Q: QueueRepository,
    L: DeliveryLogRepository,
    T: DeliveryTransport,
{
    pub schedules: S,
    pub queue: Q,
    pub logs: L,
    pub transport: T,
    /// Identifies this process in `claimed_by` for operator debugging.
    pub worker_id: String,
    pub batch_limit: u64,
    /// Base unit of the linear retry backoff: attempt n waits `n * backoff`.
    pub retry_backoff: Duration,
}

impl<S, Q, L, T> DeliveryWorker<S, Q, L, T>
where
    S: ScheduleRepository,
    Q: QueueRepository,
    L: DeliveryLogRepository,
    T: DeliveryTransport,
{
    /// One poll cycle. Returns how many entries were processed. A failure on
    /// one entry never aborts the rest of the batch.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<usize, OutreachServiceError> {
        let claimed = self
            .queue
            .claim_due(now, self.batch_limit, &self.worker_id)
            .await?;

        let mut processed = 0;
        for entry in claimed {
            let entry_id = entry.id;
            match self.process_entry(entry, now).await {
                Ok(()) => processed += 1,
                Err(err) => {
                    error!(entry_id = %entry_id, error = %err, "delivery processing failed");
                }
            }
        }
        Ok(processed)
    }

    async fn process_entry(
        &self,
        entry: QueueEntry,
        now: DateTime<Utc>,
    ) -> Result<(), OutreachServiceError> {
        // A claimed entry may be stale: the schedule was cancelled, or a
        // previous run already delivered it. Retire such entries quietly.
        let schedule = match self.schedules.find_by_id(entry.schedule_id).await? {
            Some(schedule) if schedule.status == ScheduleStatus::Scheduled => schedule,
            _ => {
                self.queue.complete(entry.id).await?;
                return Ok(());
            }
        };

        let message = OutboundMessage {
            schedule_id: schedule.id,
            to: schedule.recipient_email.clone(),
            subject: schedule.subject.clone(),
            content: schedule.content.clone(),
        };
        let attempt_number = entry.attempts + 1;

        match self.transport.send(&message).await {
            Ok(provider_id) => {
                self.logs
                    .append(&NewDeliveryLog {
                        schedule_id: schedule.id,
                        attempt_number,
                        status: ScheduleStatus::Sent,
                        attempted_at: now,
                        delivered_at: Some(now),
                        error_message: None,
                    })
                    .await?;
                self.schedules.mark_sent(schedule.id, now).await?;
                self.queue.complete(entry.id).await?;
                info!(
                    schedule_id = %schedule.id,
                    provider_id = %provider_id,
                    attempt = attempt_number,
                    "delivered"
                );
            }
            Err(err) => {
                let reason = err.to_string();
                self.logs
                    .append(&NewDeliveryLog {
                        schedule_id: schedule.id,
                        attempt_number,
                        status: ScheduleStatus::Failed,
                        attempted_at: now,
                        delivered_at: None,
                        error_message: Some(reason.clone()),
                    })
                    .await?;

                if attempt_number >= entry.max_attempts {
                    self.queue
                        .mark_failed(entry.id, attempt_number, &reason)
                        .await?;
                    self.schedules.mark_failed(schedule.id, &reason).await?;
                    warn!(
                        schedule_id = %schedule.id,
                        attempts = attempt_number,
                        error = %reason,
                        "delivery failed permanently"
                    );
                } else {
                    let next_attempt_at = now + self.retry_backoff * attempt_number;
                    self.queue
                        .release_for_retry(entry.id, attempt_number, next_attempt_at, &reason)
                        .await?;
                    info!(
                        schedule_id = %schedule.id,
                        attempt = attempt_number,
                        next_attempt_at = %next_attempt_at,
                        "delivery failed, retry scheduled"
                    );
                }
            }
        }

        Ok(())
    }

    /// Backfill queue entries for schedules the best-effort enqueue missed.
    /// The unique index on `schedule_id` makes a concurrent double sweep
    /// collapse into one entry, so races only cost a logged warning.
    pub async fn reconcile(&self) -> Result<usize, OutreachServiceError> {
        let orphaned = self.schedules.find_unqueued(self.batch_limit).await?;

        let mut enqueued = 0;
        for schedule in orphaned {
            match self.queue.enqueue(schedule.id, DEFAULT_PRIORITY).await {
                Ok(_) => {
                    enqueued += 1;
                    info!(schedule_id = %schedule.id, "reconciled missing queue entry");
                }
                Err(err) => {
                    warn!(schedule_id = %schedule.id, error = %err, "reconcile enqueue failed");
                }
            }
        }
        Ok(enqueued)
    }
}
