use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;
use uuid::Uuid;

use touchbase_core::identity::IdentityHeaders;

use crate::error::OutreachServiceError;
use crate::state::AppState;
use crate::usecase::schedule::ListDeliveryLogsUseCase;

#[derive(Serialize)]
pub struct DeliveryLogResponse {
    pub id: String,
    pub attempt_number: i32,
    pub status: String,
    #[serde(serialize_with = "touchbase_core::serde::to_rfc3339_ms")]
    pub attempted_at: chrono::DateTime<chrono::Utc>,
    #[serde(serialize_with = "touchbase_core::serde::to_rfc3339_ms_opt")]
    pub delivered_at: Option<chrono::DateTime<chrono::Utc>>,
    pub error_message: Option<String>,
}

// ── GET /schedules/{id}/delivery-logs ────────────────────────────────────────

pub async fn get_delivery_logs(
    identity: IdentityHeaders,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<DeliveryLogResponse>>, OutreachServiceError> {
    let usecase = ListDeliveryLogsUseCase {
        schedules: state.schedule_repo(),
        logs: state.delivery_log_repo(),
    };
    let logs = usecase.execute(id, identity.user_id).await?;
    let items = logs
        .into_iter()
        .map(|log| DeliveryLogResponse {
            id: log.id.to_string(),
            attempt_number: log.attempt_number,
            status: log.status.as_str().to_owned(),
            attempted_at: log.attempted_at,
            delivered_at: log.delivered_at,
            error_message: log.error_message,
        })
        .collect();
    Ok(Json(items))
}
