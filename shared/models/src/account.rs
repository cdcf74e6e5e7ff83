use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Error,
}

/// A user's credential-backed connection to one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct LinkedAccount {
    pub id: String,
    pub user_id: String,
    pub provider_id: String,
    /// The account identifier on the provider's side.
    pub account_id: String,
    #[serde(skip_serializing, default)]
    pub credentials: String,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LinkedAccount {
    pub fn new(
        user_id: impl Into<String>,
        provider_id: impl Into<String>,
        account_id: impl Into<String>,
        credentials: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: crate::new_id(),
            user_id: user_id.into(),
            provider_id: provider_id.into(),
            account_id: account_id.into(),
            credentials: credentials.into(),
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LinkAccountRequest {
    #[validate(length(min = 1, max = 128))]
    pub provider_id: String,
    #[validate(length(min = 1, max = 256))]
    pub account_id: String,
    #[validate(length(min = 1))]
    pub credentials: String,
}
