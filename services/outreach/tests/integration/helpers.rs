use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use touchbase_domain::pagination::PageRequest;
use touchbase_outreach::domain::repository::{
    CampaignRepository, DeliveryLogRepository, DeliveryTransport, QueueRepository,
    RecipientRepository, ScheduleRepository,
};
use touchbase_outreach::domain::types::{
    Campaign, DEFAULT_MAX_ATTEMPTS, DeliveryLogEntry, NewDeliveryLog, NewSchedule,
    OutboundMessage, QueueEntry, QueueEntryStatus, Recipient, Schedule, ScheduleFilter,
    SchedulePatch, ScheduleStatus, TransportError,
};
use touchbase_outreach::error::OutreachServiceError;

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn test_campaign(created_by: Uuid) -> Campaign {
    Campaign {
        id: Uuid::new_v4(),
        created_by,
        name: "Quarterly check-in".to_owned(),
        subject_template: "Checking in, {{name}}".to_owned(),
        body_template: "Hi {{name}}, it has been a while.".to_owned(),
        status: "active".to_owned(),
    }
}

pub fn test_recipient() -> Recipient {
    Recipient {
        id: Uuid::new_v4(),
        name: "Dana".to_owned(),
        email: Some("dana@example.com".to_owned()),
    }
}

pub fn test_recipient_without_email() -> Recipient {
    Recipient {
        id: Uuid::new_v4(),
        name: "Lee".to_owned(),
        email: None,
    }
}

pub fn test_schedule(created_by: Uuid, status: ScheduleStatus) -> Schedule {
    let now = Utc::now();
    Schedule {
        id: Uuid::new_v4(),
        campaign_id: Uuid::new_v4(),
        recipient_id: Uuid::new_v4(),
        scheduled_at: now - chrono::Duration::minutes(5),
        cadence_kind: "single".to_owned(),
        cadence_data: serde_json::json!({}),
        subject: "Checking in, Dana".to_owned(),
        content: "Hi Dana, it has been a while.".to_owned(),
        recipient_email: "dana@example.com".to_owned(),
        status,
        error_message: None,
        sent_at: None,
        created_by,
        created_at: now,
        updated_at: now,
    }
}

pub fn test_queue_entry(schedule_id: Uuid, attempts: i32) -> QueueEntry {
    let now = Utc::now();
    QueueEntry {
        id: Uuid::new_v4(),
        schedule_id,
        priority: 100,
        attempts,
        max_attempts: DEFAULT_MAX_ATTEMPTS,
        next_attempt_at: now - chrono::Duration::minutes(1),
        last_error: None,
        status: QueueEntryStatus::Pending,
        claimed_by: None,
        claimed_at: None,
        enqueued_at: now,
    }
}

// ── MockCampaignRepo ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockCampaignRepo {
    pub campaigns: Vec<Campaign>,
}

impl MockCampaignRepo {
    pub fn new(campaigns: Vec<Campaign>) -> Self {
        Self { campaigns }
    }

    pub fn empty() -> Self {
        Self { campaigns: vec![] }
    }
}

impl CampaignRepository for MockCampaignRepo {
    async fn find_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Campaign>, OutreachServiceError> {
        Ok(self
            .campaigns
            .iter()
            .find(|c| c.id == id && c.created_by == user_id)
            .cloned())
    }
}

// ── MockRecipientRepo ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockRecipientRepo {
    pub recipients: Vec<Recipient>,
}

impl MockRecipientRepo {
    pub fn new(recipients: Vec<Recipient>) -> Self {
        Self { recipients }
    }

    pub fn empty() -> Self {
        Self { recipients: vec![] }
    }
}

impl RecipientRepository for MockRecipientRepo {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Recipient>, OutreachServiceError> {
        Ok(self.recipients.iter().find(|r| r.id == id).cloned())
    }
}

// ── MockScheduleRepo ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockScheduleRepo {
    pub schedules: Arc<Mutex<Vec<Schedule>>>,
    /// What `find_unqueued` hands to the reconciliation sweep.
    pub unqueued: Arc<Mutex<Vec<Schedule>>>,
    /// Served once by the next `find_owned`, regardless of stored state.
    stale_view: Arc<Mutex<Option<Schedule>>>,
}

impl MockScheduleRepo {
    pub fn new(schedules: Vec<Schedule>) -> Self {
        Self {
            schedules: Arc::new(Mutex::new(schedules)),
            unqueued: Arc::new(Mutex::new(vec![])),
            stale_view: Arc::new(Mutex::new(None)),
        }
    }

    /// Make the next `find_owned` return `schedule` instead of the stored
    /// row. Lets a test slip a concurrent write between read and update.
    pub fn serve_stale_read(&self, schedule: Schedule) {
        *self.stale_view.lock().unwrap() = Some(schedule);
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    /// Shared handle to the stored schedules for post-execution inspection.
    pub fn schedules_handle(&self) -> Arc<Mutex<Vec<Schedule>>> {
        Arc::clone(&self.schedules)
    }
}

impl ScheduleRepository for MockScheduleRepo {
    async fn insert_many(
        &self,
        new_schedules: &[NewSchedule],
    ) -> Result<Vec<Schedule>, OutreachServiceError> {
        let now = Utc::now();
        let records: Vec<Schedule> = new_schedules
            .iter()
            .map(|new| Schedule {
                id: Uuid::new_v4(),
                campaign_id: new.campaign_id,
                recipient_id: new.recipient_id,
                scheduled_at: new.scheduled_at,
                cadence_kind: new.cadence_kind.clone(),
                cadence_data: new.cadence_data.clone(),
                subject: new.subject.clone(),
                content: new.content.clone(),
                recipient_email: new.recipient_email.clone(),
                status: ScheduleStatus::Scheduled,
                error_message: None,
                sent_at: None,
                created_by: new.created_by,
                created_at: now,
                updated_at: now,
            })
            .collect();
        self.schedules.lock().unwrap().extend(records.clone());
        Ok(records)
    }

    async fn list(
        &self,
        user_id: Uuid,
        filter: ScheduleFilter,
        page: PageRequest,
    ) -> Result<Vec<Schedule>, OutreachServiceError> {
        let mut matched: Vec<Schedule> = self
            .schedules
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.created_by == user_id)
            .filter(|s| filter.campaign_id.is_none_or(|id| s.campaign_id == id))
            .filter(|s| filter.recipient_id.is_none_or(|id| s.recipient_id == id))
            .filter(|s| filter.status.is_none_or(|status| s.status == status))
            .cloned()
            .collect();
        matched.sort_by_key(|s| s.scheduled_at);
        Ok(matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.clamped().per_page as usize)
            .collect())
    }

    async fn find_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Schedule>, OutreachServiceError> {
        if let Some(stale) = self.stale_view.lock().unwrap().take() {
            return Ok(Some(stale));
        }
        Ok(self
            .schedules
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id && s.created_by == user_id)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Schedule>, OutreachServiceError> {
        Ok(self
            .schedules
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn update_partial(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: SchedulePatch,
    ) -> Result<Option<Schedule>, OutreachServiceError> {
        let mut schedules = self.schedules.lock().unwrap();
        let Some(schedule) = schedules
            .iter_mut()
            .find(|s| s.id == id && s.created_by == user_id)
        else {
            return Ok(None);
        };
        // Matches the database repository: sent rows are never updated.
        if schedule.status == ScheduleStatus::Sent {
            return Err(OutreachServiceError::ScheduleLocked);
        }
        if let Some(scheduled_at) = patch.scheduled_at {
            schedule.scheduled_at = scheduled_at;
        }
        if let Some(subject) = patch.subject {
            schedule.subject = subject;
        }
        if let Some(content) = patch.content {
            schedule.content = content;
        }
        if let Some(status) = patch.status {
            schedule.status = status;
        }
        schedule.updated_at = Utc::now();
        Ok(Some(schedule.clone()))
    }

    async fn delete_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, OutreachServiceError> {
        let mut schedules = self.schedules.lock().unwrap();
        let before = schedules.len();
        schedules.retain(|s| !(s.id == id && s.created_by == user_id));
        Ok(schedules.len() < before)
    }

    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), OutreachServiceError> {
        if let Some(schedule) = self.schedules.lock().unwrap().iter_mut().find(|s| s.id == id) {
            schedule.status = ScheduleStatus::Sent;
            schedule.sent_at = Some(at);
            schedule.error_message = None;
            schedule.updated_at = at;
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), OutreachServiceError> {
        if let Some(schedule) = self.schedules.lock().unwrap().iter_mut().find(|s| s.id == id) {
            schedule.status = ScheduleStatus::Failed;
            schedule.error_message = Some(error.to_owned());
            schedule.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn find_unqueued(&self, limit: u64) -> Result<Vec<Schedule>, OutreachServiceError> {
        Ok(self
            .unqueued
            .lock()
            .unwrap()
            .iter()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// ── MockQueueRepo ────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockQueueRepo {
    pub entries: Arc<Mutex<Vec<QueueEntry>>>,
    pub fail_enqueue: bool,
}

impl MockQueueRepo {
    pub fn new(entries: Vec<QueueEntry>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(entries)),
            fail_enqueue: false,
        }
    }

    pub fn empty() -> Self {
        Self::new(vec![])
    }

    pub fn failing() -> Self {
        Self {
            entries: Arc::new(Mutex::new(vec![])),
            fail_enqueue: true,
        }
    }

    pub fn entries_handle(&self) -> Arc<Mutex<Vec<QueueEntry>>> {
        Arc::clone(&self.entries)
    }
}

impl QueueRepository for MockQueueRepo {
    async fn enqueue(
        &self,
        schedule_id: Uuid,
        priority: i32,
    ) -> Result<QueueEntry, OutreachServiceError> {
        if self.fail_enqueue {
            return Err(OutreachServiceError::Internal(anyhow::anyhow!(
                "queue unavailable"
            )));
        }
        let mut entries = self.entries.lock().unwrap();
        // Unique schedule_id, same as the database index.
        if entries.iter().any(|e| e.schedule_id == schedule_id) {
            return Err(OutreachServiceError::Internal(anyhow::anyhow!(
                "duplicate queue entry for schedule {schedule_id}"
            )));
        }
        let now = Utc::now();
        let entry = QueueEntry {
            id: Uuid::new_v4(),
            schedule_id,
            priority,
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            next_attempt_at: now,
            last_error: None,
            status: QueueEntryStatus::Pending,
            claimed_by: None,
            claimed_at: None,
            enqueued_at: now,
        };
        entries.push(entry.clone());
        Ok(entry)
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
        worker_id: &str,
    ) -> Result<Vec<QueueEntry>, OutreachServiceError> {
        let mut entries = self.entries.lock().unwrap();
        let mut due: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.status == QueueEntryStatus::Pending && e.next_attempt_at <= now)
            .map(|(i, _)| i)
            .collect();
        due.sort_by_key(|&i| (entries[i].priority, entries[i].next_attempt_at));
        due.truncate(limit as usize);

        let mut claimed = Vec::with_capacity(due.len());
        for i in due {
            let entry = &mut entries[i];
            entry.status = QueueEntryStatus::Processing;
            entry.claimed_by = Some(worker_id.to_owned());
            entry.claimed_at = Some(now);
            claimed.push(entry.clone());
        }
        Ok(claimed)
    }

    async fn complete(&self, entry_id: Uuid) -> Result<(), OutreachServiceError> {
        if let Some(entry) = self.entries.lock().unwrap().iter_mut().find(|e| e.id == entry_id) {
            entry.status = QueueEntryStatus::Completed;
        }
        Ok(())
    }

    async fn release_for_retry(
        &self,
        entry_id: Uuid,
        attempts: i32,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), OutreachServiceError> {
        if let Some(entry) = self.entries.lock().unwrap().iter_mut().find(|e| e.id == entry_id) {
            entry.status = QueueEntryStatus::Pending;
            entry.attempts = attempts;
            entry.next_attempt_at = next_attempt_at;
            entry.last_error = Some(error.to_owned());
            entry.claimed_by = None;
            entry.claimed_at = None;
        }
        Ok(())
    }

    async fn mark_failed(
        &self,
        entry_id: Uuid,
        attempts: i32,
        error: &str,
    ) -> Result<(), OutreachServiceError> {
        if let Some(entry) = self.entries.lock().unwrap().iter_mut().find(|e| e.id == entry_id) {
            entry.status = QueueEntryStatus::Failed;
            entry.attempts = attempts;
            entry.last_error = Some(error.to_owned());
        }
        Ok(())
    }

    async fn find_by_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<Option<QueueEntry>, OutreachServiceError> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.schedule_id == schedule_id)
            .cloned())
    }

    async fn delete_unclaimed(&self, schedule_id: Uuid) -> Result<bool, OutreachServiceError> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|e| {
            !(e.schedule_id == schedule_id && e.status == QueueEntryStatus::Pending)
        });
        Ok(entries.len() < before)
    }
}

// ── MockDeliveryLogRepo ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct MockDeliveryLogRepo {
    pub logs: Arc<Mutex<Vec<DeliveryLogEntry>>>,
}

impl MockDeliveryLogRepo {
    pub fn empty() -> Self {
        Self {
            logs: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn logs_handle(&self) -> Arc<Mutex<Vec<DeliveryLogEntry>>> {
        Arc::clone(&self.logs)
    }
}

impl DeliveryLogRepository for MockDeliveryLogRepo {
    async fn append(&self, entry: &NewDeliveryLog) -> Result<(), OutreachServiceError> {
        self.logs.lock().unwrap().push(DeliveryLogEntry {
            id: Uuid::new_v4(),
            schedule_id: entry.schedule_id,
            attempt_number: entry.attempt_number,
            status: entry.status,
            attempted_at: entry.attempted_at,
            delivered_at: entry.delivered_at,
            error_message: entry.error_message.clone(),
        });
        Ok(())
    }

    async fn list_for_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<Vec<DeliveryLogEntry>, OutreachServiceError> {
        Ok(self
            .logs
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.schedule_id == schedule_id)
            .cloned()
            .collect())
    }
}

// ── MockTransport ────────────────────────────────────────────────────────────

/// Programmable transport: queued outcomes are consumed in order, and every
/// outbound message is recorded. An empty outcome queue means success.
#[derive(Clone)]
pub struct MockTransport {
    pub outcomes: Arc<Mutex<VecDeque<Result<String, TransportError>>>>,
    pub sent: Arc<Mutex<Vec<OutboundMessage>>>,
}

impl MockTransport {
    pub fn always_ok() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn with_outcomes(outcomes: Vec<Result<String, TransportError>>) -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(outcomes.into())),
            sent: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self::with_outcomes(vec![Err(TransportError(reason.to_owned()))])
    }

    pub fn sent_handle(&self) -> Arc<Mutex<Vec<OutboundMessage>>> {
        Arc::clone(&self.sent)
    }
}

impl DeliveryTransport for MockTransport {
    async fn send(&self, message: &OutboundMessage) -> Result<String, TransportError> {
        self.sent.lock().unwrap().push(message.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("provider-message-id".to_owned()))
    }
}
