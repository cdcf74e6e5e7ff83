use async_trait::async_trait;
use billhub_models::{Bill, BillStatus, LinkedAccount, Provider};
use chrono::{Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;

use super::{BillProvider, ProviderError};

pub const SIMULATED_PROVIDER_ID: &str = "mock-provider";

/// In-process provider for local development. Fails a share of calls with a
/// timeout and otherwise issues one random bill.
#[derive(Debug, Clone)]
pub struct SimulatedBillProvider {
    failure_rate: f64,
}

impl SimulatedBillProvider {
    pub fn new() -> Self {
        Self::with_failure_rate(0.2)
    }

    pub fn with_failure_rate(failure_rate: f64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
        }
    }

    fn random_bill(&self, account: &LinkedAccount) -> Bill {
        let mut rng = rand::thread_rng();
        let now = Utc::now();
        let status = match rng.gen_range(0..3) {
            0 => BillStatus::Paid,
            1 => BillStatus::Unpaid,
            _ => BillStatus::Overdue,
        };

        Bill {
            id: String::new(),
            linked_account_id: account.id.clone(),
            provider_id: account.provider_id.clone(),
            amount: Decimal::new(rng.gen_range(0..10_000), 2),
            due_date: now + Duration::days(rng.gen_range(0..30)),
            bill_date: now,
            status,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for SimulatedBillProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BillProvider for SimulatedBillProvider {
    async fn fetch_bills(&self, account: &LinkedAccount) -> Result<Vec<Bill>, ProviderError> {
        let failed = rand::thread_rng().gen_bool(self.failure_rate);
        if failed {
            return Err(ProviderError::Timeout);
        }
        Ok(vec![self.random_bill(account)])
    }

    async fn validate_credentials(&self, credentials: &str) -> Result<bool, ProviderError> {
        Ok(!credentials.trim().is_empty())
    }

    fn provider_info(&self) -> Provider {
        let now = Utc::now();
        Provider {
            id: SIMULATED_PROVIDER_ID.to_string(),
            name: "Mock Provider".to_string(),
            api_endpoint: "in-process".to_string(),
            auth_type: "none".to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}
