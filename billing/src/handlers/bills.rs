use actix_web::{web, HttpResponse};
use serde_json::json;

use super::{AppState, UserId};
use crate::errors::ServiceError;
use crate::services::CancelSignal;

pub fn configure_bill_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/bills")
            .route("", web::get().to(fetch_bills))
            .route("/summary", web::get().to(get_bill_summary))
            .route("/refresh", web::post().to(refresh_bills)),
    );
}

// A client disconnect drops the handler future, which stops every unit
// polled inside it.
pub async fn fetch_bills(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse, ServiceError> {
    let signal = CancelSignal::new();
    let summary = state.orchestrator.fetch_bills(user.as_str(), &signal).await?;
    Ok(HttpResponse::Ok().json(summary))
}

pub async fn fetch_bills_by_provider(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let provider_id = path.into_inner();
    let signal = CancelSignal::new();
    let summary = state
        .orchestrator
        .fetch_bills_by_provider(user.as_str(), &provider_id, &signal)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

pub async fn get_bill_summary(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse, ServiceError> {
    let summary = state.orchestrator.bill_summary(user.as_str()).await?;
    Ok(HttpResponse::Ok().json(summary))
}

pub async fn refresh_bills(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse, ServiceError> {
    let signal = CancelSignal::new();
    state.orchestrator.refresh_bills(user.as_str(), &signal).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Bill refresh completed" })))
}
