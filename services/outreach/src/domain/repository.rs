#![allow(async_fn_in_trait)]

use chrono::{DateTime, Utc};
use uuid::Uuid;

use touchbase_domain::pagination::PageRequest;

use crate::domain::types::{
    Campaign, DeliveryLogEntry, NewDeliveryLog, NewSchedule, OutboundMessage, QueueEntry,
    Recipient, Schedule, ScheduleFilter, SchedulePatch, TransportError,
};
use crate::error::OutreachServiceError;

/// Read-only port for campaign lookup (ownership enforced by filter).
pub trait CampaignRepository: Send + Sync {
    async fn find_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Campaign>, OutreachServiceError>;
}

/// Read-only port for recipient lookup.
pub trait RecipientRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Recipient>, OutreachServiceError>;
}

/// Repository for durable schedule records.
pub trait ScheduleRepository: Send + Sync {
    /// Insert the whole batch in a single transaction — all or nothing.
    /// Returns the created records with their generated ids.
    async fn insert_many(
        &self,
        schedules: &[NewSchedule],
    ) -> Result<Vec<Schedule>, OutreachServiceError>;

    async fn list(
        &self,
        user_id: Uuid,
        filter: ScheduleFilter,
        page: PageRequest,
    ) -> Result<Vec<Schedule>, OutreachServiceError>;

    async fn find_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Schedule>, OutreachServiceError>;

    /// Worker-side lookup, no ownership filter.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Schedule>, OutreachServiceError>;

    /// Apply a partial owner edit. Returns the updated record, or `None` if
    /// the schedule does not exist or is not owned by `user_id`.
    async fn update_partial(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: SchedulePatch,
    ) -> Result<Option<Schedule>, OutreachServiceError>;

    /// Delete an owned schedule row. Returns `true` if a row was deleted.
    async fn delete_owned(&self, id: Uuid, user_id: Uuid)
    -> Result<bool, OutreachServiceError>;

    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), OutreachServiceError>;

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), OutreachServiceError>;

    /// Reconciliation scan: scheduled rows that have no queue entry.
    async fn find_unqueued(&self, limit: u64) -> Result<Vec<Schedule>, OutreachServiceError>;
}

/// Repository for the delivery queue.
pub trait QueueRepository: Send + Sync {
    /// Insert one entry for a schedule. Fails if one already exists
    /// (unique schedule_id keeps reconciliation idempotent).
    async fn enqueue(
        &self,
        schedule_id: Uuid,
        priority: i32,
    ) -> Result<QueueEntry, OutreachServiceError>;

    /// Atomically claim up to `limit` due entries for `worker_id`.
    ///
    /// An entry is due when it is pending, its `next_attempt_at` has passed,
    /// and its schedule's `scheduled_at <= now`. Ordered by priority, then
    /// scheduled time. The claim is a conditional update on `status`, so two
    /// workers never receive the same entry.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
        worker_id: &str,
    ) -> Result<Vec<QueueEntry>, OutreachServiceError>;

    /// Terminal success: mark the entry completed.
    async fn complete(&self, entry_id: Uuid) -> Result<(), OutreachServiceError>;

    /// Return a failed entry to the pending pool for a later retry.
    async fn release_for_retry(
        &self,
        entry_id: Uuid,
        attempts: i32,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), OutreachServiceError>;

    /// Terminal failure: attempts exhausted.
    async fn mark_failed(
        &self,
        entry_id: Uuid,
        attempts: i32,
        error: &str,
    ) -> Result<(), OutreachServiceError>;

    async fn find_by_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<Option<QueueEntry>, OutreachServiceError>;

    /// Delete the entry for a schedule only while it is still pending.
    /// Returns `true` if a row was deleted.
    async fn delete_unclaimed(&self, schedule_id: Uuid) -> Result<bool, OutreachServiceError>;
}

/// Append-only delivery attempt log.
pub trait DeliveryLogRepository: Send + Sync {
    async fn append(&self, entry: &NewDeliveryLog) -> Result<(), OutreachServiceError>;

    async fn list_for_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<Vec<DeliveryLogEntry>, OutreachServiceError>;
}

/// Port to the external message transport. The wire protocol is out of
/// scope; success yields a provider message id.
pub trait DeliveryTransport: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<String, TransportError>;
}
