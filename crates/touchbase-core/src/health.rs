use axum::http::StatusCode;

/// Liveness probe (`GET /healthz`): the process is up.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Readiness probe (`GET /readyz`): ready to take traffic. A service with
/// real warm-up work (pending migrations, cache priming) mounts its own
/// probe instead.
pub async fn readyz() -> StatusCode {
    StatusCode::OK
}
