use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use billhub_billing::handlers::{configure_routes, AppState};
use billhub_billing::services::{
    providers::{HttpBillProvider, SimulatedBillProvider},
    AccountService, BillCache, BillOrchestrator, BillProvider, CancelSignal, MemoryBillCache, OrchestratorSettings,
    ProviderCatalogue, ProviderRegistry, RefreshScheduler, UserService,
};
use billhub_config::AppConfig;
use billhub_database::{BillingStore, Database, DatabaseConfig};
use billhub_observability::{init_tracing, request_logging, TracingConfig};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize observability with structured logging
    init_tracing(TracingConfig::for_service("billing-service"));

    let config = AppConfig::from_env()?;
    let toggles = config.feature_toggles.clone();
    tracing::info!(features = ?toggles.enabled_features(), "[Billing Service] Feature toggles loaded");

    // Database connection - always required
    tracing::info!("📊 [Billing Service] Connecting to database...");
    let redis_url = if toggles.redis_enabled() {
        config.redis_url.clone()
    } else {
        tracing::warn!("[Billing Service] Redis disabled via feature toggles");
        None
    };
    let db_config = DatabaseConfig::new(config.database_url.clone(), redis_url)
        .with_max_connections(config.db_max_connections);
    let database = Database::connect(&db_config).await?;
    database.migrate().await?;
    tracing::info!("✅ [Billing Service] Database connection established");

    let repositories = database.repositories();
    let store: Arc<dyn BillingStore> = Arc::new(repositories.clone());

    let cache: Arc<dyn BillCache> = match database.cache() {
        Some(redis) => {
            tracing::info!("🔴 [Billing Service] Using Redis bill cache");
            Arc::new(redis.clone())
        }
        None => {
            tracing::warn!("[Billing Service] Redis unavailable - using in-memory bill cache");
            Arc::new(MemoryBillCache::new())
        }
    };

    // Linked accounts reference the catalogue, so the simulated provider needs a row too
    let simulated = if toggles.simulated_providers_enabled() {
        let simulated = SimulatedBillProvider::new();
        repositories.providers().upsert(&simulated.provider_info()).await?;
        tracing::warn!("[Billing Service] Simulated provider enabled");
        Some(simulated)
    } else {
        None
    };

    let registry = ProviderRegistry::new();
    for provider in repositories.providers().list().await? {
        if !provider.api_endpoint.starts_with("http") {
            continue;
        }
        tracing::info!(provider_id = %provider.id, endpoint = %provider.api_endpoint, "[Billing Service] Registered provider {}", provider.name);
        registry.register(Arc::new(HttpBillProvider::new(provider)));
    }
    if let Some(simulated) = simulated {
        registry.register(Arc::new(simulated));
    }
    let registry = Arc::new(registry);

    let orchestrator = Arc::new(BillOrchestrator::new(
        store.clone(),
        registry.clone(),
        cache.clone(),
        OrchestratorSettings::from_config(&config.fetch),
    ));
    tracing::info!(
        policy = %config.fetch.failure_policy,
        max_concurrency = config.fetch.max_concurrency,
        rate_limit = config.fetch.rate_limit,
        "[Billing Service] Bill orchestrator ready"
    );

    let shutdown = CancelSignal::new();
    let scheduler = if toggles.periodic_refresh_enabled() {
        let scheduler = RefreshScheduler::new(orchestrator.clone(), store.clone(), config.refresh_interval);
        Some(scheduler.spawn(shutdown.clone()))
    } else {
        tracing::warn!("[Billing Service] Periodic refresh disabled via feature toggles");
        None
    };

    let state = AppState {
        orchestrator,
        accounts: AccountService::new(store.clone(), registry.clone(), cache.clone()),
        users: UserService::new(store.clone(), cache),
        catalogue: ProviderCatalogue::new(store.clone(), registry.clone()),
        registry,
        store,
    };

    let port = config.port;
    tracing::info!("🚀 [Billing Service] Starting on port {}", port);
    HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header();

        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(cors)
            .wrap(request_logging("billing-service"))
            .configure(configure_routes)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await?;

    tracing::info!("[Billing Service] Shutting down");
    shutdown.cancel();
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            tracing::error!("[Billing Service] Refresh scheduler ended abnormally: {}", e);
        }
    }

    Ok(())
}
