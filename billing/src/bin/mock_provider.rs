//! Stand-alone provider API for local development. Serves random bills with
//! random latency and occasional failures.

use actix_web::{web, App, HttpResponse, HttpServer};
use billhub_billing::services::providers::http::ProviderBillPayload;
use billhub_observability::{init_tracing, request_logging, TracingConfig};
use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

const PROVIDERS: [&str; 5] = [
    "Electricity Co",
    "Water Works",
    "Gas Supply",
    "Internet Provider",
    "Phone Company",
];

#[derive(Debug, Deserialize)]
struct BillsQuery {
    account_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValidateRequest {
    credentials: String,
}

fn random_bill() -> ProviderBillPayload {
    let mut rng = rand::thread_rng();
    let statuses = ["paid", "unpaid", "overdue"];
    let provider = PROVIDERS[rng.gen_range(0..PROVIDERS.len())];
    let now = Utc::now();

    ProviderBillPayload {
        id: Some(format!("BILL-{}", rng.gen_range(0..10_000))),
        amount: Decimal::new(rng.gen_range(0..100_000), 2),
        due_date: now + chrono::Duration::days(rng.gen_range(0..30)),
        bill_date: Some(now),
        status: statuses[rng.gen_range(0..statuses.len())].to_string(),
        description: Some(format!("Bill for {} services", provider)),
    }
}

/// Up to one second of latency, then a 10% chance of failing.
async fn simulate_upstream() -> bool {
    let (delay_ms, fail) = {
        let mut rng = rand::thread_rng();
        (rng.gen_range(0..1000), rng.gen_bool(0.1))
    };
    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    !fail
}

async fn get_bills(query: web::Query<BillsQuery>) -> HttpResponse {
    if !simulate_upstream().await {
        return HttpResponse::InternalServerError().json(serde_json::json!({ "error": "Internal server error" }));
    }

    let count = rand::thread_rng().gen_range(1..=5);
    let bills: Vec<ProviderBillPayload> = (0..count).map(|_| random_bill()).collect();
    tracing::debug!(account_id = ?query.account_id, count, "Serving mock bills");
    HttpResponse::Ok().json(bills)
}

async fn validate(request: web::Json<ValidateRequest>) -> HttpResponse {
    let valid = !request.credentials.trim().is_empty();
    HttpResponse::Ok().json(serde_json::json!({ "valid": valid }))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("OK")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    init_tracing(TracingConfig::for_service("mock-provider"));
    dotenv::dotenv().ok();

    let port = std::env::var("MOCK_PROVIDER_PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(8083);

    tracing::info!("🚀 [Mock Provider] Starting on port {}", port);
    HttpServer::new(|| {
        App::new()
            .wrap(request_logging("mock-provider"))
            .route("/health", web::get().to(health))
            .route("/bills", web::get().to(get_bills))
            .route("/validate", web::post().to(validate))
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
