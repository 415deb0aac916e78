//! Background loops driving the delivery worker: the queue drain tick and
//! the slower reconciliation sweep.

use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::OutreachConfig;
use crate::infra::db::{DbDeliveryLogRepository, DbQueueRepository, DbScheduleRepository};
use crate::infra::transport::HttpTransport;
use crate::state::AppState;
use crate::usecase::delivery::DeliveryWorker;

pub type DbDeliveryWorker =
    DeliveryWorker<DbScheduleRepository, DbQueueRepository, DbDeliveryLogRepository, HttpTransport>;

pub fn build_worker(state: &AppState, config: &OutreachConfig) -> DbDeliveryWorker {
    DeliveryWorker {
        schedules: state.schedule_repo(),
        queue: state.queue_repo(),
        logs: state.delivery_log_repo(),
        transport: HttpTransport::new(
            config.transport_url.as_str(),
            config.transport_api_key.clone(),
        ),
        worker_id: format!("outreach-{}", Uuid::new_v4()),
        batch_limit: config.worker_batch_limit,
        retry_backoff: chrono::Duration::seconds(config.retry_backoff_secs as i64),
    }
}

/// Poll the queue forever. Tick errors are logged and the loop keeps going;
/// a broken database connection heals on a later tick.
pub async fn run_delivery_loop(worker: DbDeliveryWorker, poll_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(poll_secs.max(1)));
    info!(worker_id = %worker.worker_id, "delivery worker started");
    loop {
        ticker.tick().await;
        match worker.tick(Utc::now()).await {
            Ok(0) => {}
            Ok(processed) => info!(processed, "delivery tick complete"),
            Err(err) => error!(error = %err, "delivery tick failed"),
        }
    }
}

/// Backfill missing queue entries on a slow interval.
pub async fn run_reconcile_loop(worker: DbDeliveryWorker, interval_secs: u64) {
    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
    loop {
        ticker.tick().await;
        match worker.reconcile().await {
            Ok(0) => {}
            Ok(enqueued) => info!(enqueued, "reconciliation sweep complete"),
            Err(err) => error!(error = %err, "reconciliation sweep failed"),
        }
    }
}
