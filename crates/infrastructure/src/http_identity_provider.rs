//! HTTP adapter for the hosted identity provider.
//!
//! Calls the provider's user-info endpoint with the access token under
//! verification; the provider validates the token signature and session on
//! its side.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use severatee_application::{IdentityProvider, VerifiedIdentity};
use severatee_core::{AppError, AppResult, UserId};

/// Configuration for the identity provider endpoint.
#[derive(Clone)]
pub struct HttpIdentityProviderConfig {
    /// Provider base URL, without a trailing slash.
    pub base_url: String,
    /// Project API key sent alongside every request.
    pub api_key: String,
}

/// Identity provider adapter backed by the provider's REST API.
#[derive(Clone)]
pub struct HttpIdentityProvider {
    client: reqwest::Client,
    config: HttpIdentityProviderConfig,
}

impl HttpIdentityProvider {
    /// Creates a provider adapter with its own connection pool.
    #[must_use]
    pub fn new(config: HttpIdentityProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    id: uuid::Uuid,
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    full_name: Option<String>,
    name: Option<String>,
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn verify_access_token(&self, access_token: &str) -> AppResult<VerifiedIdentity> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.config.base_url))
            .bearer_auth(access_token)
            .header("apikey", &self.config.api_key)
            .send()
            .await
            .map_err(|error| {
                AppError::Internal(format!("identity provider request failed: {error}"))
            })?;

        if response.status() == StatusCode::UNAUTHORIZED
            || response.status() == StatusCode::FORBIDDEN
        {
            return Err(AppError::Unauthorized(
                "access token rejected by identity provider".to_owned(),
            ));
        }

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "identity provider returned status {}",
                response.status()
            )));
        }

        let user_info: UserInfoResponse = response.json().await.map_err(|error| {
            AppError::Internal(format!("failed to decode identity provider response: {error}"))
        })?;

        Ok(VerifiedIdentity {
            user_id: UserId::from_uuid(user_info.id),
            email: user_info.email,
            display_name: user_info
                .user_metadata
                .full_name
                .or(user_info.user_metadata.name),
        })
    }
}
