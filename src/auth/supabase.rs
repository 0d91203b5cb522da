//! Supabase auth: resolves access tokens through the GoTrue `/user` endpoint.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use super::{AuthProvider, AuthUser};
use crate::config::AuthConfig;
use crate::error::AuthError;

/// Auth provider backed by a Supabase project.
pub struct SupabaseAuth {
    url: String,
    service_key: SecretString,
    client: reqwest::Client,
}

impl SupabaseAuth {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            url: config.url.clone(),
            service_key: config.service_key.clone(),
            client: reqwest::Client::new(),
        }
    }

    fn user_url(&self) -> String {
        format!("{}/auth/v1/user", self.url)
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuth {
    async fn get_user(&self, token: &str) -> Result<AuthUser, AuthError> {
        let resp = self
            .client
            .get(self.user_url())
            .header("apikey", self.service_key.expose_secret())
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AuthError::Provider(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED
            || status == reqwest::StatusCode::FORBIDDEN
            || status == reqwest::StatusCode::NOT_FOUND
        {
            return Err(AuthError::InvalidToken);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::Provider(format!("GET /auth/v1/user returned {status}: {body}")));
        }

        let user: AuthUser = resp
            .json()
            .await
            .map_err(|e| AuthError::Provider(format!("Malformed user response: {e}")))?;
        if user.id.is_empty() {
            return Err(AuthError::InvalidToken);
        }
        Ok(user)
    }
}
