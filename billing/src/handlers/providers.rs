use actix_web::{web, HttpResponse};
use billhub_models::CreateProviderRequest;
use serde_json::json;

use super::{bills, AppState, UserId};
use crate::errors::ServiceError;

pub fn configure_provider_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/providers")
            .route("", web::get().to(list_providers))
            .route("", web::post().to(create_provider))
            .route("/{provider_id}", web::get().to(get_provider))
            .route("/{provider_id}/bills", web::get().to(bills::fetch_bills_by_provider)),
    );
}

pub async fn list_providers(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.registry.catalogue())
}

pub async fn create_provider(
    state: web::Data<AppState>,
    _user: UserId,
    request: web::Json<CreateProviderRequest>,
) -> Result<HttpResponse, ServiceError> {
    let provider = state.catalogue.create_provider(request.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "provider_id": provider.id,
        "message": "Provider created successfully"
    })))
}

pub async fn get_provider(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ServiceError> {
    let provider = state.catalogue.get_provider(&path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(provider))
}
