pub mod accounts;
pub mod bills;
pub mod providers;
pub mod users;

use actix_web::{dev::Payload, web, FromRequest, HttpRequest, HttpResponse};
use billhub_database::BillingStore;
use billhub_observability::USER_ID_HEADER;
use std::future::{ready, Ready};
use std::sync::Arc;

use crate::errors::ServiceError;
use crate::services::{AccountService, BillOrchestrator, ProviderCatalogue, ProviderRegistry, UserService};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BillOrchestrator>,
    pub accounts: AccountService,
    pub users: UserService,
    pub catalogue: ProviderCatalogue,
    pub registry: Arc<ProviderRegistry>,
    pub store: Arc<dyn BillingStore>,
}

/// Caller identity, established upstream and forwarded as `X-User-ID`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for UserId {
    type Error = ServiceError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| UserId(v.to_string()))
            .ok_or_else(|| ServiceError::Unauthorized("Missing X-User-ID header".to_string()));
        ready(user_id)
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check)).service(
        web::scope("/api/v1")
            .configure(bills::configure_bill_routes)
            .configure(providers::configure_provider_routes)
            .configure(accounts::configure_account_routes)
            .configure(users::configure_user_routes),
    );
}

async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    match state.store.ping().await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "status": "healthy",
            "service": "billing-service",
            "database": "connected",
            "timestamp": chrono::Utc::now()
        })),
        Err(e) => {
            tracing::error!("[Billing Service] Database health check failed: {:#}", e);
            HttpResponse::ServiceUnavailable().json(serde_json::json!({
                "status": "unhealthy",
                "service": "billing-service",
                "database": "disconnected",
                "timestamp": chrono::Utc::now()
            }))
        }
    }
}
