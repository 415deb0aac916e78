use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use uuid::Uuid;

use touchbase_domain::pagination::PageRequest;
use touchbase_outreach_schema::{campaigns, delivery_logs, queue_entries, recipients, schedules};

use crate::domain::repository::{
    CampaignRepository, DeliveryLogRepository, QueueRepository, RecipientRepository,
    ScheduleRepository,
};
use crate::domain::types::{
    Campaign, DEFAULT_MAX_ATTEMPTS, DeliveryLogEntry, NewDeliveryLog, NewSchedule, QueueEntry,
    QueueEntryStatus, Recipient, Schedule, ScheduleFilter, SchedulePatch, ScheduleStatus,
};
use crate::error::OutreachServiceError;

// ── Campaign repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbCampaignRepository {
    pub db: DatabaseConnection,
}

impl CampaignRepository for DbCampaignRepository {
    async fn find_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Campaign>, OutreachServiceError> {
        let model = campaigns::Entity::find_by_id(id)
            .filter(campaigns::Column::CreatedBy.eq(user_id))
            .one(&self.db)
            .await
            .context("find owned campaign")?;
        Ok(model.map(campaign_from_model))
    }
}

fn campaign_from_model(model: campaigns::Model) -> Campaign {
    Campaign {
        id: model.id,
        created_by: model.created_by,
        name: model.name,
        subject_template: model.subject_template,
        body_template: model.body_template,
        status: model.status,
    }
}

// ── Recipient repository ──────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbRecipientRepository {
    pub db: DatabaseConnection,
}

impl RecipientRepository for DbRecipientRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Recipient>, OutreachServiceError> {
        let model = recipients::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find recipient")?;
        Ok(model.map(|m| Recipient {
            id: m.id,
            name: m.name,
            email: m.email,
        }))
    }
}

// ── Schedule repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbScheduleRepository {
    pub db: DatabaseConnection,
}

impl ScheduleRepository for DbScheduleRepository {
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

        let actives: Vec<schedules::ActiveModel> =
            records.iter().map(schedule_active_model).collect();
        self.db
            .transaction::<_, (), sea_orm::DbErr>(|txn| {
                Box::pin(async move {
                    schedules::Entity::insert_many(actives).exec(txn).await?;
                    Ok(())
                })
            })
            .await
            .context("insert schedule batch")?;
        Ok(records)
    }

    async fn list(
        &self,
        user_id: Uuid,
        filter: ScheduleFilter,
        page: PageRequest,
    ) -> Result<Vec<Schedule>, OutreachServiceError> {
        let mut query = schedules::Entity::find()
            .filter(schedules::Column::CreatedBy.eq(user_id));
        if let Some(campaign_id) = filter.campaign_id {
            query = query.filter(schedules::Column::CampaignId.eq(campaign_id));
        }
        if let Some(recipient_id) = filter.recipient_id {
            query = query.filter(schedules::Column::RecipientId.eq(recipient_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(schedules::Column::Status.eq(status.as_str()));
        }

        let models = query
            .order_by_asc(schedules::Column::ScheduledAt)
            .offset(page.offset())
            .limit(page.per_page as u64)
            .all(&self.db)
            .await
            .context("list schedules")?;
        models
            .into_iter()
            .map(schedule_from_model)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }

    async fn find_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Schedule>, OutreachServiceError> {
        let model = schedules::Entity::find_by_id(id)
            .filter(schedules::Column::CreatedBy.eq(user_id))
            .one(&self.db)
            .await
            .context("find owned schedule")?;
        model.map(schedule_from_model).transpose().map_err(Into::into)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Schedule>, OutreachServiceError> {
        let model = schedules::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .context("find schedule")?;
        model.map(schedule_from_model).transpose().map_err(Into::into)
    }

    async fn update_partial(
        &self,
        id: Uuid,
        user_id: Uuid,
        patch: SchedulePatch,
    ) -> Result<Option<Schedule>, OutreachServiceError> {
        let now = Utc::now();
        // Status guard lives in the UPDATE itself: a schedule the worker
        // delivers between the caller's read and this write must stay sent.
        let mut update = schedules::Entity::update_many()
            .filter(schedules::Column::Id.eq(id))
            .filter(schedules::Column::CreatedBy.eq(user_id))
            .filter(schedules::Column::Status.ne(ScheduleStatus::Sent.as_str()))
            .col_expr(schedules::Column::UpdatedAt, Expr::value(now));
        if let Some(scheduled_at) = patch.scheduled_at {
            update = update.col_expr(schedules::Column::ScheduledAt, Expr::value(scheduled_at));
        }
        if let Some(subject) = patch.subject {
            update = update.col_expr(schedules::Column::Subject, Expr::value(subject));
        }
        if let Some(content) = patch.content {
            update = update.col_expr(schedules::Column::Content, Expr::value(content));
        }
        if let Some(status) = patch.status {
            update = update.col_expr(schedules::Column::Status, Expr::value(status.as_str()));
        }

        let result = update.exec(&self.db).await.context("update schedule")?;
        if result.rows_affected == 0 {
            // Zero rows: the schedule is gone, or it became sent mid-flight.
            return match self.find_owned(id, user_id).await? {
                Some(current) if current.status == ScheduleStatus::Sent => {
                    Err(OutreachServiceError::ScheduleLocked)
                }
                _ => Ok(None),
            };
        }
        self.find_owned(id, user_id).await
    }

    async fn delete_owned(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<bool, OutreachServiceError> {
        let result = schedules::Entity::delete_many()
            .filter(schedules::Column::Id.eq(id))
            .filter(schedules::Column::CreatedBy.eq(user_id))
            .exec(&self.db)
            .await
            .context("delete schedule")?;
        Ok(result.rows_affected > 0)
    }

    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), OutreachServiceError> {
        schedules::Entity::update_many()
            .filter(schedules::Column::Id.eq(id))
            .col_expr(
                schedules::Column::Status,
                Expr::value(ScheduleStatus::Sent.as_str()),
            )
            .col_expr(schedules::Column::SentAt, Expr::value(Some(at)))
            .col_expr(
                schedules::Column::ErrorMessage,
                Expr::value(Option::<String>::None),
            )
            .col_expr(schedules::Column::UpdatedAt, Expr::value(at))
            .exec(&self.db)
            .await
            .context("mark schedule sent")?;
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), OutreachServiceError> {
        let now = Utc::now();
        schedules::Entity::update_many()
            .filter(schedules::Column::Id.eq(id))
            .col_expr(
                schedules::Column::Status,
                Expr::value(ScheduleStatus::Failed.as_str()),
            )
            .col_expr(
                schedules::Column::ErrorMessage,
                Expr::value(Some(error.to_owned())),
            )
            .col_expr(schedules::Column::UpdatedAt, Expr::value(now))
            .exec(&self.db)
            .await
            .context("mark schedule failed")?;
        Ok(())
    }

    async fn find_unqueued(&self, limit: u64) -> Result<Vec<Schedule>, OutreachServiceError> {
        let models = schedules::Entity::find()
            .filter(schedules::Column::Status.eq(ScheduleStatus::Scheduled.as_str()))
            .filter(
                schedules::Column::Id.not_in_subquery(
                    Query::select()
                        .column(queue_entries::Column::ScheduleId)
                        .from(queue_entries::Entity)
                        .to_owned(),
                ),
            )
            .order_by_asc(schedules::Column::ScheduledAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("find unqueued schedules")?;
        models
            .into_iter()
            .map(schedule_from_model)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }
}

fn schedule_active_model(record: &Schedule) -> schedules::ActiveModel {
    schedules::ActiveModel {
        id: Set(record.id),
        campaign_id: Set(record.campaign_id),
        recipient_id: Set(record.recipient_id),
        scheduled_at: Set(record.scheduled_at),
        cadence_kind: Set(record.cadence_kind.clone()),
        cadence_data: Set(record.cadence_data.clone()),
        subject: Set(record.subject.clone()),
        content: Set(record.content.clone()),
        recipient_email: Set(record.recipient_email.clone()),
        status: Set(record.status.as_str().to_owned()),
        error_message: Set(record.error_message.clone()),
        sent_at: Set(record.sent_at),
        created_by: Set(record.created_by),
        created_at: Set(record.created_at),
        updated_at: Set(record.updated_at),
    }
}

fn schedule_from_model(model: schedules::Model) -> Result<Schedule, anyhow::Error> {
    let status = ScheduleStatus::parse(&model.status)
        .with_context(|| format!("unknown schedule status {:?}", model.status))?;
    Ok(Schedule {
        id: model.id,
        campaign_id: model.campaign_id,
        recipient_id: model.recipient_id,
        scheduled_at: model.scheduled_at,
        cadence_kind: model.cadence_kind,
        cadence_data: model.cadence_data,
        subject: model.subject,
        content: model.content,
        recipient_email: model.recipient_email,
        status,
        error_message: model.error_message,
        sent_at: model.sent_at,
        created_by: model.created_by,
        created_at: model.created_at,
        updated_at: model.updated_at,
    })
}

// ── Queue repository ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbQueueRepository {
    pub db: DatabaseConnection,
}

impl QueueRepository for DbQueueRepository {
    async fn enqueue(
        &self,
        schedule_id: Uuid,
        priority: i32,
    ) -> Result<QueueEntry, OutreachServiceError> {
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
        queue_entries::ActiveModel {
            id: Set(entry.id),
            schedule_id: Set(entry.schedule_id),
            priority: Set(entry.priority),
            attempts: Set(entry.attempts),
            max_attempts: Set(entry.max_attempts),
            next_attempt_at: Set(entry.next_attempt_at),
            last_error: Set(None),
            status: Set(entry.status.as_str().to_owned()),
            claimed_by: Set(None),
            claimed_at: Set(None),
            processed_at: Set(None),
            enqueued_at: Set(entry.enqueued_at),
        }
        .insert(&self.db)
        .await
        .context("enqueue schedule")?;
        Ok(entry)
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: u64,
        worker_id: &str,
    ) -> Result<Vec<QueueEntry>, OutreachServiceError> {
        let candidates = queue_entries::Entity::find()
            .filter(queue_entries::Column::Status.eq(QueueEntryStatus::Pending.as_str()))
            .filter(queue_entries::Column::NextAttemptAt.lte(now))
            .inner_join(schedules::Entity)
            .filter(schedules::Column::ScheduledAt.lte(now))
            .order_by_asc(queue_entries::Column::Priority)
            .order_by_asc(schedules::Column::ScheduledAt)
            .limit(limit)
            .all(&self.db)
            .await
            .context("find due queue entries")?;

        // Claim each candidate with a conditional update; rows_affected == 0
        // means another worker won the race and the entry is skipped.
        let mut claimed = Vec::with_capacity(candidates.len());
        for model in candidates {
            let result = queue_entries::Entity::update_many()
                .filter(queue_entries::Column::Id.eq(model.id))
                .filter(
                    queue_entries::Column::Status.eq(QueueEntryStatus::Pending.as_str()),
                )
                .col_expr(
                    queue_entries::Column::Status,
                    Expr::value(QueueEntryStatus::Processing.as_str()),
                )
                .col_expr(
                    queue_entries::Column::ClaimedBy,
                    Expr::value(Some(worker_id.to_owned())),
                )
                .col_expr(queue_entries::Column::ClaimedAt, Expr::value(Some(now)))
                .exec(&self.db)
                .await
                .context("claim queue entry")?;
            if result.rows_affected == 1 {
                let mut entry = queue_entry_from_model(model)?;
                entry.status = QueueEntryStatus::Processing;
                entry.claimed_by = Some(worker_id.to_owned());
                entry.claimed_at = Some(now);
                claimed.push(entry);
            }
        }
        Ok(claimed)
    }

    async fn complete(&self, entry_id: Uuid) -> Result<(), OutreachServiceError> {
        let now = Utc::now();
        queue_entries::Entity::update_many()
            .filter(queue_entries::Column::Id.eq(entry_id))
            .col_expr(
                queue_entries::Column::Status,
                Expr::value(QueueEntryStatus::Completed.as_str()),
            )
            .col_expr(queue_entries::Column::ProcessedAt, Expr::value(Some(now)))
            .exec(&self.db)
            .await
            .context("complete queue entry")?;
        Ok(())
    }

    async fn release_for_retry(
        &self,
        entry_id: Uuid,
        attempts: i32,
        next_attempt_at: DateTime<Utc>,
        error: &str,
    ) -> Result<(), OutreachServiceError> {
        queue_entries::Entity::update_many()
            .filter(queue_entries::Column::Id.eq(entry_id))
            .col_expr(
                queue_entries::Column::Status,
                Expr::value(QueueEntryStatus::Pending.as_str()),
            )
            .col_expr(queue_entries::Column::Attempts, Expr::value(attempts))
            .col_expr(
                queue_entries::Column::NextAttemptAt,
                Expr::value(next_attempt_at),
            )
            .col_expr(
                queue_entries::Column::LastError,
                Expr::value(Some(error.to_owned())),
            )
            .col_expr(
                queue_entries::Column::ClaimedBy,
                Expr::value(Option::<String>::None),
            )
            .col_expr(
                queue_entries::Column::ClaimedAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .exec(&self.db)
            .await
            .context("release queue entry for retry")?;
        Ok(())
    }

    async fn mark_failed(
        &self,
        entry_id: Uuid,
        attempts: i32,
        error: &str,
    ) -> Result<(), OutreachServiceError> {
        let now = Utc::now();
        queue_entries::Entity::update_many()
            .filter(queue_entries::Column::Id.eq(entry_id))
            .col_expr(
                queue_entries::Column::Status,
                Expr::value(QueueEntryStatus::Failed.as_str()),
            )
            .col_expr(queue_entries::Column::Attempts, Expr::value(attempts))
            .col_expr(
                queue_entries::Column::LastError,
                Expr::value(Some(error.to_owned())),
            )
            .col_expr(queue_entries::Column::ProcessedAt, Expr::value(Some(now)))
            .exec(&self.db)
            .await
            .context("fail queue entry")?;
        Ok(())
    }

    async fn find_by_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<Option<QueueEntry>, OutreachServiceError> {
        let model = queue_entries::Entity::find()
            .filter(queue_entries::Column::ScheduleId.eq(schedule_id))
            .one(&self.db)
            .await
            .context("find queue entry by schedule")?;
        model
            .map(queue_entry_from_model)
            .transpose()
            .map_err(Into::into)
    }

    async fn delete_unclaimed(&self, schedule_id: Uuid) -> Result<bool, OutreachServiceError> {
        let result = queue_entries::Entity::delete_many()
            .filter(queue_entries::Column::ScheduleId.eq(schedule_id))
            .filter(queue_entries::Column::Status.eq(QueueEntryStatus::Pending.as_str()))
            .exec(&self.db)
            .await
            .context("delete unclaimed queue entry")?;
        Ok(result.rows_affected > 0)
    }
}

fn queue_entry_from_model(model: queue_entries::Model) -> Result<QueueEntry, anyhow::Error> {
    let status = QueueEntryStatus::parse(&model.status)
        .with_context(|| format!("unknown queue entry status {:?}", model.status))?;
    Ok(QueueEntry {
        id: model.id,
        schedule_id: model.schedule_id,
        priority: model.priority,
        attempts: model.attempts,
        max_attempts: model.max_attempts,
        next_attempt_at: model.next_attempt_at,
        last_error: model.last_error,
        status,
        claimed_by: model.claimed_by,
        claimed_at: model.claimed_at,
        enqueued_at: model.enqueued_at,
    })
}

// ── Delivery log repository ───────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbDeliveryLogRepository {
    pub db: DatabaseConnection,
}

impl DeliveryLogRepository for DbDeliveryLogRepository {
    async fn append(&self, entry: &NewDeliveryLog) -> Result<(), OutreachServiceError> {
        delivery_logs::ActiveModel {
            id: Set(Uuid::new_v4()),
            schedule_id: Set(entry.schedule_id),
            attempt_number: Set(entry.attempt_number),
            status: Set(entry.status.as_str().to_owned()),
            attempted_at: Set(entry.attempted_at),
            delivered_at: Set(entry.delivered_at),
            error_message: Set(entry.error_message.clone()),
        }
        .insert(&self.db)
        .await
        .context("append delivery log")?;
        Ok(())
    }

    async fn list_for_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<Vec<DeliveryLogEntry>, OutreachServiceError> {
        let models = delivery_logs::Entity::find()
            .filter(delivery_logs::Column::ScheduleId.eq(schedule_id))
            .order_by_asc(delivery_logs::Column::AttemptedAt)
            .all(&self.db)
            .await
            .context("list delivery logs")?;
        models
            .into_iter()
            .map(delivery_log_from_model)
            .collect::<Result<_, _>>()
            .map_err(Into::into)
    }
}

fn delivery_log_from_model(model: delivery_logs::Model) -> Result<DeliveryLogEntry, anyhow::Error> {
    let status = ScheduleStatus::parse(&model.status)
        .with_context(|| format!("unknown delivery log status {:?}", model.status))?;
    Ok(DeliveryLogEntry {
        id: model.id,
        schedule_id: model.schedule_id,
        attempt_number: model.attempt_number,
        status,
        attempted_at: model.attempted_at,
        delivered_at: model.delivered_at,
        error_message: model.error_message,
    })
}
