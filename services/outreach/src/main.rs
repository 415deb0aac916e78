use sea_orm::Database;
use tracing::info;

use touchbase_core::tracing::init_tracing;
use touchbase_outreach::config::OutreachConfig;
use touchbase_outreach::router::build_router;
use touchbase_outreach::state::AppState;
use touchbase_outreach::worker::{build_worker, run_delivery_loop, run_reconcile_loop};

#[tokio::main]
async fn main() {
    init_tracing();

    let config = OutreachConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let state = AppState {
        db,
        hard_cap: config.hard_cap,
    };

    // Spawn the queue drain and the reconciliation sweep
    let delivery = build_worker(&state, &config);
    let poll_secs = config.worker_poll_secs;
    tokio::spawn(async move {
        run_delivery_loop(delivery, poll_secs).await;
    });
    let reconciler = build_worker(&state, &config);
    let reconcile_secs = config.reconcile_interval_secs;
    tokio::spawn(async move {
        run_reconcile_loop(reconciler, reconcile_secs).await;
    });

    // HTTP server
    let router = build_router(state);
    let http_addr = format!("0.0.0.0:{}", config.outreach_port);
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .expect("failed to bind");

    info!("outreach service listening on {http_addr}");
    axum::serve(listener, router).await.expect("server error");
}
