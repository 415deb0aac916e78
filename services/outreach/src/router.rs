use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use tower_http::trace::TraceLayer;

use touchbase_core::health::{healthz, readyz};
use touchbase_core::middleware::request_id_layer;

use crate::handlers::{
    delivery_log::get_delivery_logs,
    schedule::{
        create_schedules, delete_schedule, get_schedule, get_schedules, update_schedule,
    },
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Schedules
        .route("/schedules", post(create_schedules))
        .route("/schedules", get(get_schedules))
        .route("/schedules/{id}", get(get_schedule))
        .route("/schedules/{id}", patch(update_schedule))
        .route("/schedules/{id}", delete(delete_schedule))
        // Delivery logs
        .route("/schedules/{id}/delivery-logs", get(get_delivery_logs))
        .layer(TraceLayer::new_for_http())
        .layer(request_id_layer())
        .with_state(state)
}
