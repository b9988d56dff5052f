//! HTTP adapter for the hosted wallet custody provider.
//!
//! Provisioning is a single authenticated call; keys never leave the
//! provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use severatee_application::{ProvisionedWallet, WalletProvider};
use severatee_core::{AppError, AppResult};

/// Configuration for the wallet provider API.
#[derive(Clone)]
pub struct HttpWalletProviderConfig {
    /// Provider base URL, without a trailing slash.
    pub base_url: String,
    /// Application id used as the basic-auth username.
    pub app_id: String,
    /// Application secret used as the basic-auth password.
    pub app_secret: String,
}

/// Wallet provider adapter backed by the provider's REST API.
#[derive(Clone)]
pub struct HttpWalletProvider {
    client: reqwest::Client,
    config: HttpWalletProviderConfig,
}

impl HttpWalletProvider {
    /// Creates a wallet provider adapter with its own connection pool.
    #[must_use]
    pub fn new(config: HttpWalletProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[derive(Debug, Serialize)]
struct CreateWalletRequest<'a> {
    chain_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct CreateWalletResponse {
    id: String,
    address: String,
    chain_type: String,
}

#[async_trait]
impl WalletProvider for HttpWalletProvider {
    async fn create_wallet(&self) -> AppResult<ProvisionedWallet> {
        let response = self
            .client
            .post(format!("{}/v1/wallets", self.config.base_url))
            .basic_auth(&self.config.app_id, Some(&self.config.app_secret))
            .json(&CreateWalletRequest {
                chain_type: "ethereum",
            })
            .send()
            .await
            .map_err(|error| {
                AppError::Internal(format!("wallet provider request failed: {error}"))
            })?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "wallet provider returned status {}",
                response.status()
            )));
        }

        let wallet: CreateWalletResponse = response.json().await.map_err(|error| {
            AppError::Internal(format!("failed to decode wallet response: {error}"))
        })?;

        Ok(ProvisionedWallet {
            id: wallet.id,
            address: wallet.address,
            chain_type: wallet.chain_type,
        })
    }
}
