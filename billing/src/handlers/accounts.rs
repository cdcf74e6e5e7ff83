use actix_web::{web, HttpResponse};
use billhub_models::LinkAccountRequest;
use serde_json::json;

use super::{AppState, UserId};
use crate::errors::ServiceError;

pub fn configure_account_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/accounts")
            .route("", web::get().to(list_accounts))
            .route("/link", web::post().to(link_account))
            .route("/{account_id}", web::delete().to(unlink_account)),
    );
}

pub async fn list_accounts(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse, ServiceError> {
    let accounts = state.accounts.list_accounts(user.as_str()).await?;
    Ok(HttpResponse::Ok().json(accounts))
}

pub async fn link_account(
    state: web::Data<AppState>,
    user: UserId,
    request: web::Json<LinkAccountRequest>,
) -> Result<HttpResponse, ServiceError> {
    let account = state.accounts.link_account(user.as_str(), request.into_inner()).await?;
    Ok(HttpResponse::Created().json(account))
}

pub async fn unlink_account(
    state: web::Data<AppState>,
    user: UserId,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let account_id = path.into_inner();
    state.accounts.unlink_account(user.as_str(), &account_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Account unlinked"
    })))
}
