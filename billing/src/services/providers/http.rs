use async_trait::async_trait;
use billhub_models::{Bill, BillStatus, LinkedAccount, Provider};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{BillProvider, ProviderError};

/// Bill as it travels over a provider's HTTP API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderBillPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Sent as a JSON number; cents are the finest unit accepted.
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    pub due_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_date: Option<DateTime<Utc>>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
struct ValidateRequest<'a> {
    credentials: &'a str,
}

#[derive(Debug, Deserialize)]
struct ValidateResponse {
    valid: bool,
}

/// Provider reached over its REST API described by a catalogue entry.
pub struct HttpBillProvider {
    provider: Provider,
    http_client: reqwest::Client,
}

impl HttpBillProvider {
    pub fn new(provider: Provider) -> Self {
        Self::with_timeout(provider, Duration::from_secs(10))
    }

    pub fn with_timeout(provider: Provider, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self { provider, http_client }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.provider.api_endpoint.trim_end_matches('/'), path)
    }

    fn into_bill(account: &LinkedAccount, payload: ProviderBillPayload) -> Result<Bill, ProviderError> {
        let amount = payload.amount.normalize();
        if amount.is_sign_negative() || amount.scale() > 2 {
            return Err(ProviderError::Malformed(format!("invalid amount {}", payload.amount)));
        }
        let status: BillStatus = payload.status.parse().map_err(ProviderError::Malformed)?;

        let now = Utc::now();
        Ok(Bill {
            id: payload.id.unwrap_or_default(),
            linked_account_id: account.id.clone(),
            provider_id: account.provider_id.clone(),
            amount,
            due_date: payload.due_date,
            bill_date: payload.bill_date.unwrap_or(now),
            status,
            created_at: now,
            updated_at: now,
        })
    }
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::Transport(err.to_string())
    }
}

#[async_trait]
impl BillProvider for HttpBillProvider {
    async fn fetch_bills(&self, account: &LinkedAccount) -> Result<Vec<Bill>, ProviderError> {
        let url = self.url("bills");
        tracing::debug!(provider_id = %self.provider.id, account_id = %account.id, "Fetching bills from {}", url);

        let mut request = self
            .http_client
            .get(&url)
            .query(&[("account_id", account.account_id.as_str())]);
        if self.provider.uses_token_auth() {
            request = request.bearer_auth(&account.credentials);
        }

        let response = request.send().await.map_err(transport_error)?;
        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(ProviderError::Unauthorized),
            status => return Err(ProviderError::Upstream { status: status.as_u16() }),
        }

        let payloads: Vec<ProviderBillPayload> = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        payloads
            .into_iter()
            .map(|payload| Self::into_bill(account, payload))
            .collect()
    }

    async fn validate_credentials(&self, credentials: &str) -> Result<bool, ProviderError> {
        let response = self
            .http_client
            .post(self.url("validate"))
            .json(&ValidateRequest { credentials })
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => {
                let body: ValidateResponse = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::Malformed(e.to_string()))?;
                Ok(body.valid)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(false),
            status => Err(ProviderError::Upstream { status: status.as_u16() }),
        }
    }

    fn provider_info(&self) -> Provider {
        self.provider.clone()
    }
}
