use std::collections::BTreeSet;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use touchbase_core::identity::IdentityHeaders;
use touchbase_domain::cadence::{CadenceKind, CadenceRule, CustomInterval, Mode};

use crate::domain::types::{Schedule, ScheduleFilter, SchedulePatch, ScheduleStatus};
use crate::error::OutreachServiceError;
use crate::state::AppState;
use crate::usecase::schedule::{
    CancelScheduleUseCase, CreateSchedulesInput, CreateSchedulesUseCase, DEFAULT_PRIORITY,
    GetScheduleUseCase, ListSchedulesUseCase, UpdateScheduleUseCase,
};

// ── Response types ───────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct ScheduleResponse {
    pub id: String,
    pub campaign_id: String,
    pub recipient_id: String,
    #[serde(serialize_with = "touchbase_core::serde::to_rfc3339_ms")]
    pub scheduled_at: chrono::DateTime<chrono::Utc>,
    pub cadence_kind: String,
    pub subject: String,
    pub content: String,
    pub recipient_email: String,
    pub status: String,
    pub error_message: Option<String>,
    #[serde(serialize_with = "touchbase_core::serde::to_rfc3339_ms_opt")]
    pub sent_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(serialize_with = "touchbase_core::serde::to_rfc3339_ms")]
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "touchbase_core::serde::to_rfc3339_ms")]
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Schedule> for ScheduleResponse {
    fn from(schedule: Schedule) -> Self {
        Self {
            id: schedule.id.to_string(),
            campaign_id: schedule.campaign_id.to_string(),
            recipient_id: schedule.recipient_id.to_string(),
            scheduled_at: schedule.scheduled_at,
            cadence_kind: schedule.cadence_kind,
            subject: schedule.subject,
            content: schedule.content,
            recipient_email: schedule.recipient_email,
            status: schedule.status.as_str().to_owned(),
            error_message: schedule.error_message,
            sent_at: schedule.sent_at,
            created_at: schedule.created_at,
            updated_at: schedule.updated_at,
        }
    }
}

#[derive(Serialize)]
pub struct CreateSchedulesResponse {
    pub schedules: Vec<ScheduleResponse>,
}

// ── Request types ────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct CadenceDataBody {
    #[serde(default)]
    pub weekdays: BTreeSet<u8>,
    pub month_day: Option<u32>,
    pub occurrences: Option<u32>,
    pub every: Option<CustomInterval>,
}

#[derive(Deserialize)]
pub struct CreateSchedulesBody {
    pub campaign_id: Uuid,
    pub recipient_id: Uuid,
    /// Anchor date, "YYYY-MM-DD".
    pub scheduled_at: String,
    /// Send time "HH:MM"; defaults to midnight.
    pub time: Option<String>,
    /// Absent or "single" ⇒ one-off send; otherwise a recurrence family.
    pub cadence_type: Option<String>,
    pub cadence_data: Option<CadenceDataBody>,
    pub subject: Option<String>,
    pub content: Option<String>,
    /// Preview ordinals the author toggled off.
    #[serde(default)]
    pub exclusions: Vec<usize>,
    pub priority: Option<i32>,
}

impl CreateSchedulesBody {
    fn into_rule(self) -> Result<(CadenceRule, CreateRest), OutreachServiceError> {
        // The engine treats a bad anchor as an empty series, but a typo'd
        // date on the API should read as a validation error, not "no dates".
        if NaiveDate::parse_from_str(&self.scheduled_at, "%Y-%m-%d").is_err() {
            return Err(OutreachServiceError::InvalidRule);
        }
        let time = self.time.unwrap_or_else(|| "00:00".to_owned());

        let rule = match self.cadence_type.as_deref() {
            None | Some("single") => CadenceRule::single(self.scheduled_at, time),
            Some(kind) => {
                let cadence =
                    CadenceKind::parse(kind).ok_or(OutreachServiceError::InvalidRule)?;
                let data = self.cadence_data.unwrap_or_default();
                let mut rule = CadenceRule::recurring(
                    cadence,
                    self.scheduled_at,
                    time,
                    data.occurrences.unwrap_or(6),
                );
                rule.weekdays = data.weekdays;
                if let Some(month_day) = data.month_day {
                    rule.month_day = month_day;
                }
                if let Some(every) = data.every {
                    rule.custom_every = every;
                }
                rule
            }
        };
        Ok((
            rule,
            CreateRest {
                campaign_id: self.campaign_id,
                recipient_id: self.recipient_id,
                subject: self.subject,
                content: self.content,
                exclusions: self.exclusions,
                priority: self.priority,
            },
        ))
    }
}

struct CreateRest {
    campaign_id: Uuid,
    recipient_id: Uuid,
    subject: Option<String>,
    content: Option<String>,
    exclusions: Vec<usize>,
    priority: Option<i32>,
}

// ── POST /schedules ──────────────────────────────────────────────────────────

pub async fn create_schedules(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Json(body): Json<CreateSchedulesBody>,
) -> Result<(StatusCode, Json<CreateSchedulesResponse>), OutreachServiceError> {
    let (rule, rest) = body.into_rule()?;
    if rule.mode == Mode::Cadence && rule.occurrences == 0 {
        return Err(OutreachServiceError::InvalidRule);
    }

    let usecase = CreateSchedulesUseCase {
        campaigns: state.campaign_repo(),
        recipients: state.recipient_repo(),
        schedules: state.schedule_repo(),
        queue: state.queue_repo(),
        hard_cap: state.hard_cap,
    };
    let created = usecase
        .execute(
            identity.user_id,
            CreateSchedulesInput {
                campaign_id: rest.campaign_id,
                recipient_id: rest.recipient_id,
                rule,
                exclusions: rest.exclusions.into_iter().collect(),
                subject: rest.subject,
                content: rest.content,
                priority: rest.priority.unwrap_or(DEFAULT_PRIORITY),
            },
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateSchedulesResponse {
            schedules: created.into_iter().map(Into::into).collect(),
        }),
    ))
}

// ── GET /schedules ───────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct ScheduleListQuery {
    pub per_page: Option<u32>,
    pub page: Option<u32>,
    pub campaign_id: Option<Uuid>,
    pub recipient_id: Option<Uuid>,
    pub status: Option<String>,
}

pub async fn get_schedules(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    axum::extract::RawQuery(raw_query): axum::extract::RawQuery,
) -> Result<Json<Vec<ScheduleResponse>>, OutreachServiceError> {
    let query: ScheduleListQuery = raw_query
        .as_deref()
        .map(serde_qs::from_str)
        .transpose()
        .map_err(|_| OutreachServiceError::MissingData)?
        .unwrap_or_default();

    let status = query
        .status
        .as_deref()
        .map(|s| ScheduleStatus::parse(s).ok_or(OutreachServiceError::MissingData))
        .transpose()?;
    let filter = ScheduleFilter {
        campaign_id: query.campaign_id,
        recipient_id: query.recipient_id,
        status,
    };
    let page = touchbase_domain::pagination::PageRequest {
        per_page: query.per_page.unwrap_or(25),
        page: query.page.unwrap_or(1),
    };

    let usecase = ListSchedulesUseCase {
        schedules: state.schedule_repo(),
    };
    let schedules = usecase.execute(identity.user_id, filter, page).await?;
    Ok(Json(schedules.into_iter().map(Into::into).collect()))
}

// ── GET /schedules/{id} ──────────────────────────────────────────────────────

pub async fn get_schedule(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScheduleResponse>, OutreachServiceError> {
    let usecase = GetScheduleUseCase {
        schedules: state.schedule_repo(),
    };
    let schedule = usecase.execute(id, identity.user_id).await?;
    Ok(Json(schedule.into()))
}

// ── PATCH /schedules/{id} ────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpdateScheduleBody {
    pub scheduled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub subject: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
}

pub async fn update_schedule(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateScheduleBody>,
) -> Result<Json<ScheduleResponse>, OutreachServiceError> {
    let status = body
        .status
        .as_deref()
        .map(|s| ScheduleStatus::parse(s).ok_or(OutreachServiceError::MissingData))
        .transpose()?;
    let patch = SchedulePatch {
        scheduled_at: body.scheduled_at,
        subject: body.subject,
        content: body.content,
        status,
    };

    let usecase = UpdateScheduleUseCase {
        schedules: state.schedule_repo(),
    };
    let updated = usecase.execute(id, identity.user_id, patch).await?;
    Ok(Json(updated.into()))
}

// ── DELETE /schedules/{id} ───────────────────────────────────────────────────

pub async fn delete_schedule(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, OutreachServiceError> {
    let usecase = CancelScheduleUseCase {
        schedules: state.schedule_repo(),
        queue: state.queue_repo(),
    };
    usecase.execute(id, identity.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
