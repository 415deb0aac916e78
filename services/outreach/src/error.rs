use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Outreach service domain error variants.
///
/// Validation and reference errors are always raised before any row is
/// written; enqueue failures after a successful schedule insert are logged
/// and never surfaced here. Retries belong exclusively to the delivery
/// worker.
#[derive(Debug, thiserror::Error)]
pub enum OutreachServiceError {
    #[error("invalid cadence rule")]
    InvalidRule,
    #[error("missing data")]
    MissingData,
    #[error("campaign not found")]
    CampaignNotFound,
    #[error("recipient not found")]
    RecipientNotFound,
    #[error("recipient has no email address")]
    RecipientMissingEmail,
    #[error("no active occurrences to schedule")]
    EmptySeries,
    #[error("schedule not found")]
    ScheduleNotFound,
    #[error("schedule already claimed for delivery")]
    ScheduleLocked,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl OutreachServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidRule => "INVALID_RULE",
            Self::MissingData => "MISSING_DATA",
            Self::CampaignNotFound => "CAMPAIGN_NOT_FOUND",
            Self::RecipientNotFound => "RECIPIENT_NOT_FOUND",
            Self::RecipientMissingEmail => "RECIPIENT_MISSING_EMAIL",
            Self::EmptySeries => "EMPTY_SERIES",
            Self::ScheduleNotFound => "SCHEDULE_NOT_FOUND",
            Self::ScheduleLocked => "SCHEDULE_LOCKED",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for OutreachServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::InvalidRule
            | Self::MissingData
            | Self::CampaignNotFound
            | Self::RecipientNotFound
            | Self::RecipientMissingEmail
            | Self::EmptySeries => StatusCode::BAD_REQUEST,
            Self::ScheduleNotFound => StatusCode::NOT_FOUND,
            Self::ScheduleLocked => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // Log 500s only — tower-http TraceLayer already records method/uri/status
        // for all requests. 4xx are expected client errors.
        if let Self::Internal(ref e) = self {
            tracing::error!(error = %e, kind = "INTERNAL", "internal error");
        }
        let body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        (status, axum::Json(body)).into_response()
    }
}
