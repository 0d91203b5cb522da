//! Authentication: bearer token parsing and the external auth provider.
//!
//! Tokens are never validated locally; every request asks the provider who
//! the token belongs to.

pub mod supabase;

use async_trait::async_trait;
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

pub use supabase::SupabaseAuth;

/// The authenticated subject behind a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Resolves bearer tokens to users.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Look up the user a token belongs to.
    ///
    /// Returns `AuthError::InvalidToken` when the provider rejects the token.
    async fn get_user(&self, token: &str) -> Result<AuthUser, AuthError>;
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .filter(|t| !t.is_empty())
}

/// Require a valid bearer token.
pub async fn require_user(
    provider: &dyn AuthProvider,
    headers: &HeaderMap,
) -> Result<AuthUser, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::MissingToken)?;
    provider.get_user(token).await
}

/// Resolve the user if a bearer token is present.
///
/// A missing header, a rejected token, or an unreachable provider all yield
/// `None`.
pub async fn optional_user(provider: &dyn AuthProvider, headers: &HeaderMap) -> Option<AuthUser> {
    let token = bearer_token(headers)?;
    match provider.get_user(token).await {
        Ok(user) => Some(user),
        Err(e) => {
            tracing::debug!(error = %e, "Optional bearer token not accepted");
            None
        }
    }
}
