//! Caller identity and the API error type.
//!
//! Authentication happens in front of this server; requests arrive with the
//! user's id in the `x-user-id` header. Requests without one act as the
//! configured default user.

use std::fmt;

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};
use blockpress_sync::{StoreError, USER_HEADER};
use blockpress_types::UserId;
use tracing::warn;

/// Identity settings shared through a request extension.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub default_user: UserId,
}

/// The user a request acts for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller(pub UserId);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    NotFound,
    /// The request body describes an invalid document
    Invalid(String),
    BadIdentity,
    RateLimited { retry_after_secs: u64 },
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound => write!(f, "document not found"),
            ApiError::Invalid(msg) => write!(f, "invalid document: {}", msg),
            ApiError::BadIdentity => write!(f, "malformed {} header", USER_HEADER),
            ApiError::RateLimited { retry_after_secs } => {
                write!(f, "rate limited, retry after {} seconds", retry_after_secs)
            }
            ApiError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::NotFound,
            StoreError::Validation(msg) | StoreError::Serialization(msg) => ApiError::Invalid(msg),
            StoreError::Transient(msg) => ApiError::Internal(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, self.to_string()).into_response(),
            ApiError::Invalid(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()).into_response()
            }
            ApiError::BadIdentity => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            ApiError::RateLimited { retry_after_secs } => (
                StatusCode::TOO_MANY_REQUESTS,
                [(
                    axum::http::header::RETRY_AFTER,
                    retry_after_secs.to_string(),
                )],
                self.to_string(),
            )
                .into_response(),
            ApiError::Internal(_) => {
                warn!("request failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(value) = parts.headers.get(USER_HEADER) {
            let user = value.to_str().map_err(|_| ApiError::BadIdentity)?.trim();
            if user.is_empty() {
                return Err(ApiError::BadIdentity);
            }
            return Ok(Caller(UserId::new(user)));
        }

        let default_user = parts
            .extensions
            .get::<IdentityConfig>()
            .map(|identity| identity.default_user.clone())
            .ok_or_else(|| ApiError::Internal("identity layer missing".into()))?;
        Ok(Caller(default_user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> Result<Caller, ApiError> {
        let (mut parts, _) = request.into_parts();
        Caller::from_request_parts(&mut parts, &()).await
    }

    fn with_identity(builder: axum::http::request::Builder) -> Request<()> {
        builder
            .extension(IdentityConfig {
                default_user: UserId::new("local"),
            })
            .body(())
            .unwrap()
    }

    #[tokio::test]
    async fn test_header_wins_over_default() {
        let request = with_identity(Request::builder().header(USER_HEADER, " alice "));
        assert_eq!(extract(request).await, Ok(Caller(UserId::new("alice"))));
    }

    #[tokio::test]
    async fn test_missing_header_falls_back() {
        let request = with_identity(Request::builder());
        assert_eq!(extract(request).await, Ok(Caller(UserId::new("local"))));
    }

    #[tokio::test]
    async fn test_blank_header_is_rejected() {
        let request = with_identity(Request::builder().header(USER_HEADER, ""));
        assert_eq!(extract(request).await, Err(ApiError::BadIdentity));
    }

    #[test]
    fn test_store_errors_map_to_statuses() {
        let cases = [
            (StoreError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                StoreError::Validation("dup".into()),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                StoreError::Transient("disk".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }
}
