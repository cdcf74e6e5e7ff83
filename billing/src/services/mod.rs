pub mod accounts;
pub mod cache;
pub mod cancel;
pub mod catalogue;
pub mod orchestrator;
pub mod providers;
pub mod rate_limiter;
pub mod retry;
pub mod scheduler;
pub mod users;

pub use accounts::{AccountError, AccountService};
pub use cache::{BillCache, CacheError, MemoryBillCache};
pub use cancel::CancelSignal;
pub use catalogue::{CatalogueError, ProviderCatalogue};
pub use orchestrator::{AccountFetchError, BillOrchestrator, FetchError, OrchestratorSettings};
pub use providers::{BillProvider, ProviderError, ProviderRegistry};
pub use rate_limiter::{RateLimitError, RateLimiter};
pub use retry::{Backoff, RetryError, RetryPolicy, Retryable};
pub use scheduler::RefreshScheduler;
pub use users::{UserError, UserService};
