use std::collections::BTreeSet;

use anyhow::Context;
use tracing::warn;
use uuid::Uuid;

use touchbase_domain::cadence::{CadenceRule, Mode};
use touchbase_domain::pagination::PageRequest;
use touchbase_domain::preview::PreviewState;

use crate::domain::repository::{
    CampaignRepository, DeliveryLogRepository, QueueRepository, RecipientRepository,
    ScheduleRepository,
};
use crate::domain::types::{
    DeliveryLogEntry, NewSchedule, Schedule, ScheduleFilter, SchedulePatch, ScheduleStatus,
};
use crate::error::OutreachServiceError;

/// Default queue priority for owner-created schedules; lower runs sooner.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Substitute recipient tokens into a campaign template.
fn render_template(template: &str, name: &str, email: &str) -> String {
    template
        .replace("{{name}}", name)
        .replace("{{email}}", email)
}

// ── CreateSchedules ──────────────────────────────────────────────────────────

pub struct CreateSchedulesInput {
    pub campaign_id: Uuid,
    pub recipient_id: Uuid,
    pub rule: CadenceRule,
    /// Ordinals the owner toggled off in the preview.
    pub exclusions: BTreeSet<usize>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub priority: i32,
}

pub struct CreateSchedulesUseCase<C, R, S, Q>
where
    C: CampaignRepository,
    R: RecipientRepository,
    S: ScheduleRepository,
    Q: QueueRepository,
{
    pub campaigns: C,
    pub recipients: R,
    pub schedules: S,
    pub queue: Q,
    pub hard_cap: u32,
}

impl<C, R, S, Q> CreateSchedulesUseCase<C, R, S, Q>
where
    C: CampaignRepository,
    R: RecipientRepository,
    S: ScheduleRepository,
    Q: QueueRepository,
{
    pub async fn execute(
        &self,
        user_id: Uuid,
        input: CreateSchedulesInput,
    ) -> Result<Vec<Schedule>, OutreachServiceError> {
        // 1. Campaign must exist and be owned by the caller
        let campaign = self
            .campaigns
            .find_owned(input.campaign_id, user_id)
            .await?
            .ok_or(OutreachServiceError::CampaignNotFound)?;

        // 2. Recipient must exist and have a deliverable address
        let recipient = self
            .recipients
            .find_by_id(input.recipient_id)
            .await?
            .ok_or(OutreachServiceError::RecipientNotFound)?;
        let email = recipient
            .email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or(OutreachServiceError::RecipientMissingEmail)?
            .to_owned();

        // 3. Re-run the engine server-side and drop excluded ordinals
        let preview = PreviewState {
            rule: input.rule,
            exclusions: input.exclusions,
        };
        let active = preview.active(self.hard_cap);
        if active.is_empty() {
            return Err(OutreachServiceError::EmptySeries);
        }

        let cadence_kind = match preview.rule.mode {
            Mode::Single => "single".to_owned(),
            Mode::Cadence => preview.rule.cadence.as_str().to_owned(),
        };
        let cadence_data =
            serde_json::to_value(&preview.rule).context("serialize cadence rule")?;

        let subject_template = input.subject.as_deref().unwrap_or(&campaign.subject_template);
        let content_template = input.content.as_deref().unwrap_or(&campaign.body_template);
        let subject = render_template(subject_template, &recipient.name, &email);
        let content = render_template(content_template, &recipient.name, &email);

        let new_schedules: Vec<NewSchedule> = active
            .iter()
            .map(|instance| NewSchedule {
                campaign_id: campaign.id,
                recipient_id: recipient.id,
                scheduled_at: instance.date,
                cadence_kind: cadence_kind.clone(),
                cadence_data: cadence_data.clone(),
                subject: subject.clone(),
                content: content.clone(),
                recipient_email: email.clone(),
                created_by: user_id,
            })
            .collect();

        // 4. One transaction for the whole batch
        let created = self.schedules.insert_many(&new_schedules).await?;

        // 5. Enqueue each record outside the transaction; delivery is
        //    best-effort here and the reconciliation sweep backfills misses.
        for schedule in &created {
            if let Err(err) = self.queue.enqueue(schedule.id, input.priority).await {
                warn!(
                    schedule_id = %schedule.id,
                    error = %err,
                    "failed to enqueue schedule; reconciliation will pick it up"
                );
            }
        }

        Ok(created)
    }
}

// ── GetSchedule ──────────────────────────────────────────────────────────────

pub struct GetScheduleUseCase<S: ScheduleRepository> {
    pub schedules: S,
}

impl<S: ScheduleRepository> GetScheduleUseCase<S> {
    pub async fn execute(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Schedule, OutreachServiceError> {
        self.schedules
            .find_owned(id, user_id)
            .await?
            .ok_or(OutreachServiceError::ScheduleNotFound)
    }
}

// ── ListSchedules ────────────────────────────────────────────────────────────

pub struct ListSchedulesUseCase<S: ScheduleRepository> {
    pub schedules: S,
}

impl<S: ScheduleRepository> ListSchedulesUseCase<S> {
    pub async fn execute(
        &self,
        user_id: Uuid,
        filter: ScheduleFilter,
        page: PageRequest,
    ) -> Result<Vec<Schedule>, OutreachServiceError> {
        self.schedules.list(user_id, filter, page.clamped()).await
    }
}

// ── UpdateSchedule ───────────────────────────────────────────────────────────

pub struct UpdateScheduleUseCase<S: ScheduleRepository> {
    pub schedules: S,
}

impl<S: ScheduleRepository> UpdateScheduleUseCase<S> {
    pub async fn execute(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: SchedulePatch,
    ) -> Result<Schedule, OutreachServiceError> {
        if patch.is_empty() {
            return Err(OutreachServiceError::MissingData);
        }

        let current = self
            .schedules
            .find_owned(id, user_id)
            .await?
            .ok_or(OutreachServiceError::ScheduleNotFound)?;
        if current.status == ScheduleStatus::Sent {
            return Err(OutreachServiceError::ScheduleLocked);
        }

        self.schedules
            .update_partial(id, user_id, patch)
            .await?
            .ok_or(OutreachServiceError::ScheduleNotFound)
    }
}

// ── CancelSchedule ───────────────────────────────────────────────────────────

pub struct CancelScheduleUseCase<S, Q>
where
    S: ScheduleRepository,
    Q: QueueRepository,
{
    pub schedules: S,
    pub queue: Q,
}

impl<S, Q> CancelScheduleUseCase<S, Q>
where
    S: ScheduleRepository,
    Q: QueueRepository,
{
    pub async fn execute(&self, id: Uuid, user_id: Uuid) -> Result<(), OutreachServiceError> {
        let schedule = self
            .schedules
            .find_owned(id, user_id)
            .await?
            .ok_or(OutreachServiceError::ScheduleNotFound)?;
        if schedule.status == ScheduleStatus::Sent {
            return Err(OutreachServiceError::ScheduleLocked);
        }

        // A claimed or finished queue entry means a worker already owns this
        // delivery; cancellation is only allowed while the entry is pending.
        if let Some(entry) = self.queue.find_by_schedule(id).await? {
            use crate::domain::types::QueueEntryStatus;
            if entry.status != QueueEntryStatus::Pending {
                return Err(OutreachServiceError::ScheduleLocked);
            }
            if !self.queue.delete_unclaimed(id).await? {
                // Lost the race to a worker claim between the read and delete.
                return Err(OutreachServiceError::ScheduleLocked);
            }
        }

        if !self.schedules.delete_owned(id, user_id).await? {
            return Err(OutreachServiceError::ScheduleNotFound);
        }
        Ok(())
    }
}

// ── ListDeliveryLogs ─────────────────────────────────────────────────────────

pub struct ListDeliveryLogsUseCase<S, L>
where
    S: ScheduleRepository,
    L: DeliveryLogRepository,
{
    pub schedules: S,
    pub logs: L,
}

impl<S, L> ListDeliveryLogsUseCase<S, L>
where
    S: ScheduleRepository,
    L: DeliveryLogRepository,
{
    pub async fn execute(
        &self,
        schedule_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<DeliveryLogEntry>, OutreachServiceError> {
        self.schedules
            .find_owned(schedule_id, user_id)
            .await?
            .ok_or(OutreachServiceError::ScheduleNotFound)?;
        self.logs.list_for_schedule(schedule_id).await
    }
}
