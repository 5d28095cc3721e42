use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, header::AUTHORIZATION},
    routing::get,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::web::{AppError, AppState};

#[derive(Serialize, Debug)]
pub struct CronTriggerResponse {
    success: bool,
    message: String,
    due: usize,
    queued: usize,
    failed: usize,
}

fn is_authorized(headers: &HeaderMap, secret: &str) -> bool {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| token == secret)
}

/// Runs one scheduling pass on behalf of an external cron caller.
async fn trigger_cron_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<CronTriggerResponse>, AppError> {
    if !is_authorized(&headers, &app_state.cron_secret) {
        warn!("Rejected cron trigger with missing or wrong secret.");
        return Err(AppError::Unauthorized);
    }

    let report = app_state.scheduler.run_pass().await?;
    info!(
        due = report.due,
        queued = report.queued,
        failed = report.failed,
        "Cron trigger handled."
    );

    Ok(Json(CronTriggerResponse {
        success: true,
        message: format!("Processed {} monitors", report.due),
        due: report.due,
        queued: report.queued,
        failed: report.failed,
    }))
}

pub fn create_cron_router() -> Router<Arc<AppState>> {
    Router::new().route("/api/cron", get(trigger_cron_handler))
}
