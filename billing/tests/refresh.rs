mod common;

use billhub_billing::services::{
    BillCache, BillOrchestrator, CancelSignal, FetchError, MemoryBillCache, OrchestratorSettings, RefreshScheduler,
};
use billhub_database::CacheKeys;
use billhub_models::{AccountStatus, BillStatus};
use common::{bill, bill_with_id, MemoryStore, Script, ScriptedProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

struct Harness {
    store: Arc<MemoryStore>,
    provider: Arc<ScriptedProvider>,
    cache: Arc<MemoryBillCache>,
    orchestrator: Arc<BillOrchestrator>,
}

fn harness(store: MemoryStore, provider: ScriptedProvider) -> Harness {
    let store = Arc::new(store);
    let provider = Arc::new(provider);
    let cache = Arc::new(MemoryBillCache::new());
    let orchestrator = Arc::new(BillOrchestrator::new(
        store.clone(),
        provider.clone(),
        cache.clone(),
        OrchestratorSettings::default(),
    ));
    Harness {
        store,
        provider,
        cache,
        orchestrator,
    }
}

#[tokio::test(start_paused = true)]
async fn test_refresh_assigns_ids_and_persists() {
    let store = MemoryStore::new();
    let account = store.add_account("u1", "power");
    let known_id = format!("{}:known", account.id);
    let mut stored = bill_with_id(&known_id, 1, BillStatus::Unpaid);
    stored.linked_account_id = account.id.clone();
    stored.provider_id = "power".to_string();
    store.insert_bill(stored);
    let provider = ScriptedProvider::new().script(
        "power",
        Script::Bills(vec![
            bill(40, BillStatus::Unpaid),
            bill_with_id("known", 45, BillStatus::Paid),
            bill_with_id("from-provider", 12, BillStatus::Overdue),
        ]),
    );
    let h = harness(store, provider);

    h.orchestrator.refresh_bills("u1", &CancelSignal::new()).await.unwrap();

    let bills = h.store.bills();
    assert_eq!(bills.len(), 3);
    assert!(bills.iter().all(|b| b.has_id() && b.linked_account_id == account.id));
    assert_eq!(h.store.updated(), vec![known_id.clone()]);

    let created = h.store.created();
    assert_eq!(created.len(), 2);
    assert!(created.contains(&format!("{}:from-provider", account.id)));
    assert!(created.iter().all(|id| *id != known_id && !id.is_empty()));

    let cached = h.cache.get_bills(&CacheKeys::bills(&account.id)).await.unwrap();
    assert_eq!(cached.len(), 3);
    assert!(cached.iter().all(|b| b.has_id()));
}

#[tokio::test(start_paused = true)]
async fn test_same_provider_bill_id_for_two_users_stays_separate() {
    let store = MemoryStore::new();
    let first = store.add_account("u1", "power");
    let second = store.add_account("u2", "power");
    let provider = ScriptedProvider::new().script("power", Script::Bills(vec![bill_with_id("BILL-7", 20, BillStatus::Unpaid)]));
    let h = harness(store, provider);
    let signal = CancelSignal::new();

    h.orchestrator.refresh_bills("u1", &signal).await.unwrap();
    h.orchestrator.refresh_bills("u2", &signal).await.unwrap();

    assert_eq!(h.store.bills().len(), 2);
    assert!(h.store.updated().is_empty());
    assert_eq!(h.store.account_status(&second.id), Some(AccountStatus::Active));

    let mine = h.orchestrator.bill_summary("u1").await.unwrap();
    let theirs = h.orchestrator.bill_summary("u2").await.unwrap();
    assert_eq!(mine.bill_count, 1);
    assert_eq!(mine.bills[0].linked_account_id, first.id);
    assert_eq!(theirs.bill_count, 1);
    assert_eq!(theirs.bills[0].linked_account_id, second.id);
}

#[tokio::test(start_paused = true)]
async fn test_second_refresh_makes_no_provider_calls() {
    let store = MemoryStore::new();
    let account = store.add_account("u1", "power");
    let h = harness(
        store,
        ScriptedProvider::new().script("power", Script::Bills(vec![bill(3, BillStatus::Unpaid)])),
    );
    let signal = CancelSignal::new();

    h.orchestrator.refresh_bills("u1", &signal).await.unwrap();
    h.orchestrator.refresh_bills("u1", &signal).await.unwrap();

    assert_eq!(h.provider.calls_for(&account.id), 1);
    assert_eq!(h.store.created().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_cache_entries_outlive_read_path_ttl() {
    let store = MemoryStore::new();
    let account = store.add_account("u1", "power");
    let h = harness(
        store,
        ScriptedProvider::new().script("power", Script::Bills(vec![bill(3, BillStatus::Unpaid)])),
    );

    h.orchestrator.refresh_bills("u1", &CancelSignal::new()).await.unwrap();
    sleep(Duration::from_secs(2 * 3600)).await;

    assert!(h.cache.get_bills(&CacheKeys::bills(&account.id)).await.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_failing_account_does_not_abort_the_others() {
    let store = MemoryStore::new();
    let good = store.add_account("u1", "good");
    let bad = store.add_account("u1", "bad");
    let provider = ScriptedProvider::new()
        .script("good", Script::Bills(vec![bill(10, BillStatus::Unpaid)]))
        .script("bad", Script::AlwaysFail);
    let h = harness(store, provider);
    let start = Instant::now();

    h.orchestrator.refresh_bills("u1", &CancelSignal::new()).await.unwrap();

    // Linear backoff of 2s then 4s between the three attempts.
    assert_eq!(start.elapsed(), Duration::from_secs(6));
    assert_eq!(h.provider.calls_for(&bad.id), 3);
    assert_eq!(h.store.bills().len(), 1);
    assert_eq!(h.store.account_status(&bad.id), Some(AccountStatus::Error));
    assert_eq!(h.store.account_status(&good.id), Some(AccountStatus::Active));
    assert_eq!(h.store.status_updates(), vec![(bad.id.clone(), AccountStatus::Error)]);
    assert!(h.cache.get_bills(&CacheKeys::bills(&bad.id)).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_successful_refresh_reactivates_errored_account() {
    let store = MemoryStore::new();
    let account = store.add_account("u1", "power");
    store.set_account_status(&account.id, AccountStatus::Error);
    let h = harness(
        store,
        ScriptedProvider::new().script("power", Script::Bills(vec![bill(3, BillStatus::Unpaid)])),
    );

    h.orchestrator.refresh_bills("u1", &CancelSignal::new()).await.unwrap();

    assert_eq!(h.store.account_status(&account.id), Some(AccountStatus::Active));
}

#[tokio::test(start_paused = true)]
async fn test_repository_failure_skips_account_without_caching() {
    let store = MemoryStore::new();
    let broken = store.add_account("u1", "power");
    let fine = store.add_account("u1", "water");
    store.fail_bill_writes_for(&broken.id);
    let provider = ScriptedProvider::new()
        .script("power", Script::Bills(vec![bill(5, BillStatus::Unpaid)]))
        .script("water", Script::Bills(vec![bill(6, BillStatus::Unpaid)]));
    let h = harness(store, provider);

    h.orchestrator.refresh_bills("u1", &CancelSignal::new()).await.unwrap();

    assert!(h.cache.get_bills(&CacheKeys::bills(&broken.id)).await.is_none());
    assert!(h.cache.get_bills(&CacheKeys::bills(&fine.id)).await.is_some());
    assert_eq!(h.store.bills().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_refresh_reports_cancellation() {
    let store = MemoryStore::new();
    store.add_account("u1", "power");
    let h = harness(
        store,
        ScriptedProvider::new().script("power", Script::Bills(vec![bill(5, BillStatus::Unpaid)])),
    );
    let signal = CancelSignal::new();
    signal.cancel();

    let result = h.orchestrator.refresh_bills("u1", &signal).await;

    assert!(matches!(result, Err(FetchError::Cancelled)));
    assert!(h.store.bills().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_refreshes_every_user_each_period() {
    let store = MemoryStore::new();
    store.add_user("u1");
    store.add_user("u2");
    let a1 = store.add_account("u1", "power");
    let a2 = store.add_account("u2", "power");
    let h = harness(
        store,
        ScriptedProvider::new().script("power", Script::Bills(vec![bill(5, BillStatus::Unpaid)])),
    );
    let signal = CancelSignal::new();
    let handle = RefreshScheduler::new(h.orchestrator.clone(), h.store.clone(), Duration::from_secs(3600))
        .spawn(signal.clone());

    sleep(Duration::from_secs(1800)).await;
    assert_eq!(h.provider.total_calls(), 0);

    sleep(Duration::from_secs(1801)).await;
    assert_eq!(h.provider.calls_for(&a1.id), 1);
    assert_eq!(h.provider.calls_for(&a2.id), 1);

    // Refresh entries live for a day, so the next tick finds them fresh.
    sleep(Duration::from_secs(3600)).await;
    assert_eq!(h.provider.total_calls(), 2);

    signal.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_tick_survives_listing_errors() {
    let store = MemoryStore::new();
    store.state.lock().unwrap().fail_user_listing = true;
    let h = harness(store, ScriptedProvider::new());
    let scheduler = RefreshScheduler::new(h.orchestrator.clone(), h.store.clone(), Duration::from_secs(60));

    assert_eq!(scheduler.tick(&CancelSignal::new()).await, 0);

    h.store.state.lock().unwrap().fail_user_listing = false;
    h.store.add_user("u1");
    assert_eq!(scheduler.tick(&CancelSignal::new()).await, 1);
}
