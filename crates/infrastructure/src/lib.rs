//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod console_email_service;
mod http_chat_completion;
mod http_identity_provider;
mod http_submission_vault;
mod http_wallet_provider;
mod postgres_agent_task_repository;
mod postgres_chat_repository;
mod postgres_profile_repository;
mod postgres_selection_store;
mod postgres_workspace_repository;
mod smtp_email_service;

pub use console_email_service::ConsoleEmailService;
pub use http_chat_completion::{HttpChatCompletionClient, HttpChatCompletionConfig};
pub use http_identity_provider::{HttpIdentityProvider, HttpIdentityProviderConfig};
pub use http_submission_vault::{HttpSubmissionVault, HttpSubmissionVaultConfig};
pub use http_wallet_provider::{HttpWalletProvider, HttpWalletProviderConfig};
pub use postgres_agent_task_repository::PostgresAgentTaskRepository;
pub use postgres_chat_repository::PostgresChatRepository;
pub use postgres_profile_repository::PostgresProfileRepository;
pub use postgres_selection_store::PostgresWorkspaceSelectionStore;
pub use postgres_workspace_repository::PostgresWorkspaceRepository;
pub use smtp_email_service::{SmtpEmailConfig, SmtpEmailService};
