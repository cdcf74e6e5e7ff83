use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use std::fmt;

use crate::services::{AccountError, CatalogueError, FetchError, UserError};

#[derive(Debug)]
pub enum ServiceError {
    InternalError(String),
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Conflict(String),
    DatabaseError(String),
    ProviderError(String),
    ValidationError(String),
    Cancelled(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
            ServiceError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ServiceError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ServiceError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ServiceError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ServiceError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ServiceError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            ServiceError::ProviderError(msg) => write!(f, "Provider error: {}", msg),
            ServiceError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            ServiceError::Cancelled(msg) => write!(f, "Cancelled: {}", msg),
        }
    }
}

impl ServiceError {
    fn error_label(&self) -> &'static str {
        match self {
            ServiceError::InternalError(_) => "Internal server error",
            ServiceError::BadRequest(_) => "Bad request",
            ServiceError::NotFound(_) => "Not found",
            ServiceError::Unauthorized(_) => "Unauthorized",
            ServiceError::Forbidden(_) => "Forbidden",
            ServiceError::Conflict(_) => "Conflict",
            ServiceError::DatabaseError(_) => "Database error",
            ServiceError::ProviderError(_) => "Provider error",
            ServiceError::ValidationError(_) => "Validation error",
            ServiceError::Cancelled(_) => "Request cancelled",
        }
    }

    fn message(&self) -> &str {
        match self {
            ServiceError::InternalError(msg)
            | ServiceError::BadRequest(msg)
            | ServiceError::NotFound(msg)
            | ServiceError::Unauthorized(msg)
            | ServiceError::Forbidden(msg)
            | ServiceError::Conflict(msg)
            | ServiceError::DatabaseError(msg)
            | ServiceError::ProviderError(msg)
            | ServiceError::ValidationError(msg)
            | ServiceError::Cancelled(msg) => msg,
        }
    }
}

impl ResponseError for ServiceError {
    fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InternalError(_) | ServiceError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::BadRequest(_) | ServiceError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::ProviderError(_) => StatusCode::BAD_GATEWAY,
            ServiceError::Cancelled(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": self.error_label(),
            "message": self.message()
        }))
    }
}

impl From<FetchError> for ServiceError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cancelled => ServiceError::Cancelled(err.to_string()),
            FetchError::Account(e) => ServiceError::ProviderError(e.to_string()),
            FetchError::Storage(e) => {
                tracing::error!("Storage failure during bill fetch: {:#}", e);
                ServiceError::DatabaseError("Failed to load billing data".to_string())
            }
        }
    }
}

impl From<AccountError> for ServiceError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(msg) => ServiceError::ValidationError(msg),
            AccountError::UnknownProvider(_) | AccountError::NotFound(_) => ServiceError::NotFound(err.to_string()),
            AccountError::InvalidCredentials => ServiceError::BadRequest(err.to_string()),
            AccountError::Provider(e) => ServiceError::ProviderError(e.to_string()),
            AccountError::Storage(e) => {
                tracing::error!("Storage failure during account operation: {:#}", e);
                ServiceError::DatabaseError("Failed to access linked accounts".to_string())
            }
        }
    }
}

impl From<UserError> for ServiceError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::Validation(msg) => ServiceError::ValidationError(msg),
            UserError::EmailTaken(_) => ServiceError::Conflict(err.to_string()),
            UserError::NotFound(_) => ServiceError::NotFound(err.to_string()),
            UserError::Forbidden => ServiceError::Forbidden(err.to_string()),
            UserError::Hashing(e) => {
                tracing::error!("Password hashing failed: {}", e);
                ServiceError::InternalError("Failed to process password".to_string())
            }
            UserError::Storage(e) => {
                tracing::error!("Storage failure during user operation: {:#}", e);
                ServiceError::DatabaseError("Failed to access users".to_string())
            }
        }
    }
}

impl From<CatalogueError> for ServiceError {
    fn from(err: CatalogueError) -> Self {
        match err {
            CatalogueError::Validation(msg) => ServiceError::ValidationError(msg),
            CatalogueError::NameTaken(_) => ServiceError::Conflict(err.to_string()),
            CatalogueError::NotFound(_) => ServiceError::NotFound(err.to_string()),
            CatalogueError::Storage(e) => {
                tracing::error!("Storage failure during provider operation: {:#}", e);
                ServiceError::DatabaseError("Failed to access providers".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{AccountFetchError, ProviderError};

    #[test]
    fn test_fetch_errors_map_to_status_codes() {
        let cancelled: ServiceError = FetchError::Cancelled.into();
        assert_eq!(cancelled.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        let provider: ServiceError = FetchError::Account(AccountFetchError {
            account_id: "acc-1".into(),
            provider_id: "gas".into(),
            attempts: 3,
            source: ProviderError::Timeout,
        })
        .into();
        assert_eq!(provider.status_code(), StatusCode::BAD_GATEWAY);

        let storage: ServiceError = FetchError::Storage(anyhow::anyhow!("connection reset")).into();
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!storage.to_string().contains("connection reset"));
    }

    #[test]
    fn test_account_errors_map_to_status_codes() {
        let missing: ServiceError = AccountError::NotFound("acc-9".into()).into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let invalid: ServiceError = AccountError::Validation("provider_id".into()).into();
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_user_and_catalogue_errors_map_to_status_codes() {
        let taken: ServiceError = UserError::EmailTaken("ada@example.com".into()).into();
        assert_eq!(taken.status_code(), StatusCode::CONFLICT);

        let forbidden: ServiceError = UserError::Forbidden.into();
        assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);

        let storage: ServiceError = CatalogueError::Storage(anyhow::anyhow!("pool timed out")).into();
        assert_eq!(storage.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!storage.to_string().contains("pool timed out"));

        let duplicate: ServiceError = CatalogueError::NameTaken("City Power".into()).into();
        assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);
    }
}
