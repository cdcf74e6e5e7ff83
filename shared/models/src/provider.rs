use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Auth schemes a provider catalogue entry may declare.
pub const AUTH_TYPES: [&str; 3] = ["none", "bearer", "api_key"];

/// Catalog entry describing an external billing source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Provider {
    pub id: String,
    pub name: String,
    pub api_endpoint: String,
    /// How requests authenticate against the provider: `none`, `bearer` or `api_key`.
    pub auth_type: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Provider {
    pub fn new(name: impl Into<String>, api_endpoint: impl Into<String>, auth_type: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: crate::new_id(),
            name: name.into(),
            api_endpoint: api_endpoint.into(),
            auth_type: auth_type.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn uses_token_auth(&self) -> bool {
        matches!(self.auth_type.as_str(), "bearer" | "api_key")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProviderRequest {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(url)]
    pub api_endpoint: String,
    #[validate(length(min = 1))]
    pub auth_type: String,
}

impl CreateProviderRequest {
    pub fn has_known_auth_type(&self) -> bool {
        AUTH_TYPES.contains(&self.auth_type.as_str())
    }
}
