use axum::{Json, Router, routing::get};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::scheduler::Scheduler;

pub mod error;
pub mod routes;

pub use error::AppError;

#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub cron_secret: String,
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_handler))
        .merge(routes::cron_routes::create_cron_router())
        .with_state(app_state)
}
