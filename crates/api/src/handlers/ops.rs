use actix_web::{web::Data, HttpResponse};
use serde::Serialize;
use tron_deposit_monitor::LoopState;

use crate::state::AppState;

pub async fn metrics_handler(state: Data<AppState>) -> HttpResponse {
    let body = state.telemetry().render_metrics();
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(body)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub loop_state: LoopState,
}

/// Reports the embedded ingestion loop's current state. The loop never exits
/// on its own, so any answer here means it is alive.
pub async fn health_handler(state: Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        loop_state: state.loop_state(),
    })
}
