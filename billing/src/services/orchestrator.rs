use billhub_config::{FailurePolicy, FetchConfig};
use billhub_database::{BillingStore, CacheKeys};
use billhub_models::{new_id, AccountStatus, Bill, BillSummary, LinkedAccount};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Duration;

use super::cache::BillCache;
use super::cancel::CancelSignal;
use super::providers::{BillProvider, ProviderError};
use super::rate_limiter::RateLimiter;
use super::retry::{RetryError, RetryPolicy};

#[derive(Debug, thiserror::Error)]
#[error("account {account_id} ({provider_id}) failed after {attempts} attempt(s): {source}")]
pub struct AccountFetchError {
    pub account_id: String,
    pub provider_id: String,
    pub attempts: u32,
    pub source: ProviderError,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("bill fetch cancelled")]
    Cancelled,
    #[error(transparent)]
    Account(#[from] AccountFetchError),
    #[error("storage error: {0:#}")]
    Storage(anyhow::Error),
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub failure_policy: FailurePolicy,
    pub max_concurrency: usize,
    pub cache_ttl: Duration,
    pub refresh_cache_ttl: Duration,
    pub rate_limit: u32,
    pub rate_interval: Duration,
    pub fetch_retry: RetryPolicy,
    pub refresh_retry: RetryPolicy,
}

impl OrchestratorSettings {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            failure_policy: config.failure_policy,
            max_concurrency: config.max_concurrency,
            cache_ttl: config.cache_ttl,
            refresh_cache_ttl: config.refresh_cache_ttl,
            rate_limit: config.rate_limit,
            rate_interval: config.rate_interval,
            fetch_retry: RetryPolicy::exponential(config.max_attempts, config.backoff_base),
            refresh_retry: RetryPolicy::linear(config.max_attempts, config.refresh_backoff_base),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from_config(&FetchConfig::default())
    }
}

enum RefreshOutcome {
    Fresh,
    Refreshed(usize),
    Failed,
    Cancelled,
}

/// Fetches, aggregates and refreshes the bills of one user's linked accounts.
///
/// Every account is a unit of work: cache lookup, then one rate limiter
/// token, then the provider call under the retry policy. Units run
/// concurrently up to `max_concurrency` and finish in any order.
pub struct BillOrchestrator {
    store: Arc<dyn BillingStore>,
    provider: Arc<dyn BillProvider>,
    cache: Arc<dyn BillCache>,
    limiter: RateLimiter,
    settings: OrchestratorSettings,
}

impl BillOrchestrator {
    pub fn new(
        store: Arc<dyn BillingStore>,
        provider: Arc<dyn BillProvider>,
        cache: Arc<dyn BillCache>,
        settings: OrchestratorSettings,
    ) -> Self {
        let limiter = RateLimiter::new(settings.rate_limit, settings.rate_interval);
        Self {
            store,
            provider,
            cache,
            limiter,
            settings,
        }
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub async fn fetch_bills(&self, user_id: &str, signal: &CancelSignal) -> Result<BillSummary, FetchError> {
        let accounts = self.load_accounts(user_id).await?;
        self.fetch_accounts(user_id, accounts, signal).await
    }

    pub async fn fetch_bills_by_provider(
        &self,
        user_id: &str,
        provider_id: &str,
        signal: &CancelSignal,
    ) -> Result<BillSummary, FetchError> {
        let accounts = self
            .load_accounts(user_id)
            .await?
            .into_iter()
            .filter(|account| account.provider_id == provider_id)
            .collect();
        self.fetch_accounts(user_id, accounts, signal).await
    }

    /// Aggregate of the bills already persisted for the user. Never calls a provider.
    pub async fn bill_summary(&self, user_id: &str) -> Result<BillSummary, FetchError> {
        let bills = self
            .store
            .bills_for_user(user_id)
            .await
            .map_err(FetchError::Storage)?;
        Ok(BillSummary::from_bills(bills))
    }

    /// Re-fetch every account without a cached bill set and persist the
    /// result. Failed accounts are logged and skipped.
    pub async fn refresh_bills(&self, user_id: &str, signal: &CancelSignal) -> Result<(), FetchError> {
        let accounts = self.load_accounts(user_id).await?;
        if accounts.is_empty() {
            return Ok(());
        }

        let outcomes: Vec<RefreshOutcome> = stream::iter(accounts)
            .map(move |account| async move { self.refresh_account(&account, signal).await })
            .buffer_unordered(self.settings.max_concurrency.max(1))
            .collect()
            .await;

        if signal.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let (mut fresh, mut refreshed, mut failed, mut bills) = (0usize, 0usize, 0usize, 0usize);
        for outcome in outcomes {
            match outcome {
                RefreshOutcome::Fresh => fresh += 1,
                RefreshOutcome::Refreshed(count) => {
                    refreshed += 1;
                    bills += count;
                }
                RefreshOutcome::Failed | RefreshOutcome::Cancelled => failed += 1,
            }
        }
        tracing::info!(user_id = %user_id, fresh, refreshed, failed, bills, "Bill refresh completed");
        Ok(())
    }

    async fn load_accounts(&self, user_id: &str) -> Result<Vec<LinkedAccount>, FetchError> {
        self.store
            .linked_accounts_for_user(user_id)
            .await
            .map_err(FetchError::Storage)
    }

    async fn fetch_accounts(
        &self,
        user_id: &str,
        accounts: Vec<LinkedAccount>,
        signal: &CancelSignal,
    ) -> Result<BillSummary, FetchError> {
        if accounts.is_empty() {
            return Ok(BillSummary::empty());
        }

        let units = stream::iter(accounts)
            .map(move |account| async move {
                let result = self.fetch_account(&account, signal).await;
                if let Err(FetchError::Account(e)) = &result {
                    tracing::warn!(
                        user_id = %user_id,
                        account_id = %e.account_id,
                        provider_id = %e.provider_id,
                        attempts = e.attempts,
                        error = %e.source,
                        "Failed to fetch bills for account"
                    );
                }
                result
            })
            .buffer_unordered(self.settings.max_concurrency.max(1));

        let per_account: Vec<Vec<Bill>> = match self.settings.failure_policy {
            // The first failure drops the units still in flight.
            FailurePolicy::Strict => units.try_collect().await?,
            FailurePolicy::Lenient => {
                units
                    .filter_map(|result| async move { result.ok() })
                    .collect()
                    .await
            }
        };

        if signal.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        Ok(BillSummary::from_bills(per_account.into_iter().flatten().collect()))
    }

    async fn fetch_account(&self, account: &LinkedAccount, signal: &CancelSignal) -> Result<Vec<Bill>, FetchError> {
        let key = CacheKeys::bills(&account.id);
        if let Some(bills) = self.cache.get_bills(&key).await {
            if !bills.is_empty() {
                tracing::debug!(account_id = %account.id, count = bills.len(), "Serving bills from cache");
                return Ok(bills);
            }
        }

        let bills = self
            .fetch_from_provider(account, &self.settings.fetch_retry, signal)
            .await?;
        self.cache.cache_bills(&key, &bills, self.settings.cache_ttl).await;
        Ok(bills)
    }

    async fn fetch_from_provider(
        &self,
        account: &LinkedAccount,
        policy: &RetryPolicy,
        signal: &CancelSignal,
    ) -> Result<Vec<Bill>, FetchError> {
        self.limiter
            .acquire(signal)
            .await
            .map_err(|_| FetchError::Cancelled)?;

        let result = policy
            .run(signal, move |attempt| async move {
                if attempt > 0 {
                    tracing::debug!(account_id = %account.id, attempt = attempt + 1, "Retrying provider fetch");
                }
                self.provider.fetch_bills(account).await
            })
            .await;

        match result {
            Ok(bills) => Ok(bills
                .into_iter()
                .map(|mut bill| {
                    bill.assign_to(account);
                    bill
                })
                .collect()),
            Err(RetryError::Cancelled) => Err(FetchError::Cancelled),
            Err(RetryError::Failed { attempts, error }) => Err(AccountFetchError {
                account_id: account.id.clone(),
                provider_id: account.provider_id.clone(),
                attempts,
                source: error,
            }
            .into()),
        }
    }

    async fn refresh_account(&self, account: &LinkedAccount, signal: &CancelSignal) -> RefreshOutcome {
        let key = CacheKeys::bills(&account.id);
        if self.cache.get_bills(&key).await.is_some() {
            tracing::debug!(account_id = %account.id, "Cached bills still fresh; skipping refresh");
            return RefreshOutcome::Fresh;
        }

        let bills = match self
            .fetch_from_provider(account, &self.settings.refresh_retry, signal)
            .await
        {
            Ok(bills) => bills,
            Err(FetchError::Cancelled) => return RefreshOutcome::Cancelled,
            Err(e) => {
                tracing::warn!(
                    account_id = %account.id,
                    provider_id = %account.provider_id,
                    error = %e,
                    "Bill refresh failed for account"
                );
                self.record_status(account, AccountStatus::Error).await;
                return RefreshOutcome::Failed;
            }
        };

        let mut persisted = Vec::with_capacity(bills.len());
        for mut bill in bills {
            if let Err(e) = self.persist_bill(&mut bill).await {
                tracing::error!(
                    account_id = %account.id,
                    bill_id = %bill.id,
                    error = %format!("{:#}", e),
                    "Failed to persist refreshed bill"
                );
                return RefreshOutcome::Failed;
            }
            persisted.push(bill);
        }

        self.cache
            .cache_bills(&key, &persisted, self.settings.refresh_cache_ttl)
            .await;
        self.record_status(account, AccountStatus::Active).await;
        RefreshOutcome::Refreshed(persisted.len())
    }

    async fn persist_bill(&self, bill: &mut Bill) -> anyhow::Result<()> {
        if !bill.has_id() {
            bill.id = new_id();
            return self.store.create_bill(bill).await;
        }

        if !self.store.update_bill(bill).await? {
            self.store.create_bill(bill).await?;
        }
        Ok(())
    }

    async fn record_status(&self, account: &LinkedAccount, status: AccountStatus) {
        if account.status == status {
            return;
        }
        if let Err(e) = self.store.update_linked_account_status(&account.id, status).await {
            tracing::warn!(account_id = %account.id, error = %format!("{:#}", e), "Failed to update account status");
        }
    }
}
