//! HTTP adapter for the encrypted submission vault.
//!
//! Records are sent in plaintext over TLS; the vault service shards and
//! encrypts them on its side. Only the record id comes back here.

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use severatee_application::{SubmissionVault, TaskSubmission};
use severatee_core::{AppError, AppResult};

/// Configuration for the vault API.
#[derive(Clone)]
pub struct HttpSubmissionVaultConfig {
    /// Vault base URL, without a trailing slash.
    pub base_url: String,
    /// Bearer token for the vault API.
    pub api_token: String,
    /// Identifier of the submission schema registered with the vault.
    pub schema_id: String,
}

/// Submission vault adapter backed by the vault's REST API.
#[derive(Clone)]
pub struct HttpSubmissionVault {
    client: reqwest::Client,
    config: HttpSubmissionVaultConfig,
}

impl HttpSubmissionVault {
    /// Creates a vault adapter with its own connection pool.
    #[must_use]
    pub fn new(config: HttpSubmissionVaultConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SubmissionVault for HttpSubmissionVault {
    async fn store_submission(&self, submission: &TaskSubmission) -> AppResult<String> {
        let record_id = Uuid::new_v4().to_string();
        let record = json!({
            "_id": record_id,
            "schema": self.config.schema_id,
            "task_id": submission.task_id.to_string(),
            "agent_id": submission.agent_id.to_string(),
            "agent_wallet_address": submission.agent_wallet_address,
            "submitted_at": submission.submitted_at.to_rfc3339(),
            "data": {
                "answer": submission.answer,
            },
            "metadata": {
                "task_name": submission.task_name,
                "agent_name": submission.agent_name,
            },
        });

        let response = self
            .client
            .post(format!("{}/api/v1/data/create", self.config.base_url))
            .bearer_auth(&self.config.api_token)
            .json(&record)
            .send()
            .await
            .map_err(|error| AppError::Internal(format!("vault request failed: {error}")))?;

        if !response.status().is_success() {
            return Err(AppError::Internal(format!(
                "vault returned status {}",
                response.status()
            )));
        }

        Ok(record_id)
    }
}
