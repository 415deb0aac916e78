use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Campaign template the scheduler validates against. Authored elsewhere in
/// the CRM; read-only here.
#[derive(Debug, Clone)]
pub struct Campaign {
    pub id: Uuid,
    pub created_by: Uuid,
    pub name: String,
    pub subject_template: String,
    pub body_template: String,
    pub status: String,
}

/// A contact endpoint. `email` may be absent, in which case schedule
/// creation is rejected before any write.
#[derive(Debug, Clone)]
pub struct Recipient {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

/// Delivery state of a schedule record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleStatus {
    Scheduled,
    Sent,
    Failed,
}

impl ScheduleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Sent => "sent",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Durable schedule record: one committed send instant carrying the
/// originating cadence rule for audit.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub recipient_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub cadence_kind: String,
    pub cadence_data: serde_json::Value,
    pub subject: String,
    pub content: String,
    pub recipient_email: String,
    pub status: ScheduleStatus,
    pub error_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert payload for one schedule row. Ids are assigned by the repository.
#[derive(Debug, Clone)]
pub struct NewSchedule {
    pub campaign_id: Uuid,
    pub recipient_id: Uuid,
    pub scheduled_at: DateTime<Utc>,
    pub cadence_kind: String,
    pub cadence_data: serde_json::Value,
    pub subject: String,
    pub content: String,
    pub recipient_email: String,
    pub created_by: Uuid,
}

/// Partial update applied by the owner before delivery.
#[derive(Debug, Clone, Default)]
pub struct SchedulePatch {
    pub scheduled_at: Option<DateTime<Utc>>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub status: Option<ScheduleStatus>,
}

impl SchedulePatch {
    pub fn is_empty(&self) -> bool {
        self.scheduled_at.is_none()
            && self.subject.is_none()
            && self.content.is_none()
            && self.status.is_none()
    }
}

/// Filters for owner-scoped schedule listing.
#[derive(Debug, Clone, Default)]
pub struct ScheduleFilter {
    pub campaign_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub status: Option<ScheduleStatus>,
}

/// Lifecycle of a queue entry: `pending → processing → {completed | failed}`,
/// with `processing → pending` on a retryable delivery failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEntryStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl QueueEntryStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// Attempts a queue entry gets before it is failed permanently.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 3;

/// Durable unit of delivery work, 1:1 with a schedule at creation time.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub priority: i32,
    pub attempts: i32,
    pub max_attempts: i32,
    pub next_attempt_at: DateTime<Utc>,
    pub last_error: Option<String>,
    pub status: QueueEntryStatus,
    pub claimed_by: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub enqueued_at: DateTime<Utc>,
}

/// One delivery attempt, appended to the log by the worker.
#[derive(Debug, Clone)]
pub struct DeliveryLogEntry {
    pub id: Uuid,
    pub schedule_id: Uuid,
    pub attempt_number: i32,
    pub status: ScheduleStatus,
    pub attempted_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Append payload for the delivery log.
#[derive(Debug, Clone)]
pub struct NewDeliveryLog {
    pub schedule_id: Uuid,
    pub attempt_number: i32,
    pub status: ScheduleStatus,
    pub attempted_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Message handed to the delivery transport. The provider's wire format is
/// out of scope; this is the minimal envelope every channel needs.
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub schedule_id: Uuid,
    pub to: String,
    pub subject: String,
    pub content: String,
}

/// Transport-level delivery failure, recorded in the delivery log.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);
