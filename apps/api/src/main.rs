//! SeveraTEE API composition root.

#![forbid(unsafe_code)]

mod auth;
mod config;
mod dto;
mod error;
mod handlers;
mod middleware;
mod state;

use std::sync::Arc;

use axum::Router;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{delete, get, post, put};
use severatee_application::{
    ChatService, EmailService, IdentityProvider, ProfileService, TaskService,
    WorkspaceSelectionService, WorkspaceService,
};
use severatee_core::AppError;
use severatee_infrastructure::{
    ConsoleEmailService, HttpChatCompletionClient, HttpChatCompletionConfig, HttpIdentityProvider,
    HttpIdentityProviderConfig, HttpSubmissionVault, HttpSubmissionVaultConfig, HttpWalletProvider,
    HttpWalletProviderConfig, PostgresAgentTaskRepository, PostgresChatRepository,
    PostgresProfileRepository, PostgresWorkspaceRepository, PostgresWorkspaceSelectionStore,
    SmtpEmailConfig, SmtpEmailService,
};
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::cookie::time::Duration;
use tower_sessions::{Expiry, SessionManagerLayer};
use tower_sessions_sqlx_store::PostgresStore;
use tracing::info;

use crate::config::{ApiConfig, EmailProviderConfig, init_tracing};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ApiConfig::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    if config.migrate_only {
        info!("database migrations applied successfully");
        return Ok(());
    }

    let session_store = PostgresStore::new(pool.clone())
        .with_table_name("tower_sessions")
        .map_err(|error| {
            AppError::Validation(format!("invalid session table name configuration: {error}"))
        })?;
    session_store.migrate().await.map_err(|error| {
        AppError::Internal(format!("failed to initialize session store: {error}"))
    })?;

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.cookie_secure)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(30)));

    // Persistence adapters.
    let workspace_repository = Arc::new(PostgresWorkspaceRepository::new(pool.clone()));
    let profile_repository = Arc::new(PostgresProfileRepository::new(pool.clone()));
    let chat_repository = Arc::new(PostgresChatRepository::new(pool.clone()));
    let agent_task_repository = Arc::new(PostgresAgentTaskRepository::new(pool.clone()));
    let selection_store = Arc::new(PostgresWorkspaceSelectionStore::new(pool.clone()));

    // External collaborators.
    let identity_provider: Arc<dyn IdentityProvider> =
        Arc::new(HttpIdentityProvider::new(HttpIdentityProviderConfig {
            base_url: config.identity_provider_url.clone(),
            api_key: config.identity_provider_key.clone(),
        }));
    let completion_client = Arc::new(HttpChatCompletionClient::new(HttpChatCompletionConfig {
        base_url: config.chat_api_url.clone(),
        api_key: config.chat_api_key.clone(),
        model: config.chat_model.clone(),
    }));
    let wallet_provider = Arc::new(HttpWalletProvider::new(HttpWalletProviderConfig {
        base_url: config.wallet_api_url.clone(),
        app_id: config.wallet_app_id.clone(),
        app_secret: config.wallet_app_secret.clone(),
    }));
    let submission_vault = Arc::new(HttpSubmissionVault::new(HttpSubmissionVaultConfig {
        base_url: config.vault_api_url.clone(),
        api_token: config.vault_api_token.clone(),
        schema_id: config.vault_schema_id.clone(),
    }));
    let email_service: Arc<dyn EmailService> = match &config.email_provider {
        EmailProviderConfig::Smtp(smtp) => Arc::new(SmtpEmailService::new(SmtpEmailConfig {
            host: smtp.host.clone(),
            port: smtp.port,
            username: smtp.username.clone(),
            password: smtp.password.clone(),
            from_address: smtp.from_address.clone(),
        })),
        EmailProviderConfig::Console => Arc::new(ConsoleEmailService::new()),
    };

    // Application services.
    let workspace_service = WorkspaceService::new(
        workspace_repository.clone(),
        profile_repository.clone(),
        email_service,
        config.invitation_policy,
        config.frontend_url.clone(),
    );
    let selection_service =
        WorkspaceSelectionService::new(selection_store, workspace_repository);
    let profile_service = ProfileService::new(profile_repository);
    let chat_service = ChatService::new(chat_repository, completion_client);
    let task_service = TaskService::new(agent_task_repository, wallet_provider, submission_vault);

    let app_state = AppState {
        workspace_service,
        selection_service,
        profile_service,
        chat_service,
        task_service,
        identity_provider,
        frontend_url: config.frontend_url.clone(),
    };

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        .route(
            "/api/workspaces",
            get(handlers::workspaces::list_user_workspaces_handler)
                .post(handlers::workspaces::create_workspace_handler),
        )
        .route(
            "/api/workspaces/{workspace_id}",
            put(handlers::workspaces::update_workspace_handler),
        )
        .route(
            "/api/workspaces/{workspace_id}/members",
            get(handlers::workspaces::list_members_handler),
        )
        .route(
            "/api/workspaces/{workspace_id}/invitations",
            get(handlers::workspaces::list_workspace_invitations_handler)
                .post(handlers::workspaces::create_invitation_handler),
        )
        .route(
            "/api/members/{member_id}/role",
            put(handlers::workspaces::update_member_role_handler),
        )
        .route(
            "/api/members/{member_id}",
            delete(handlers::workspaces::remove_member_handler),
        )
        .route(
            "/api/invitations",
            get(handlers::workspaces::list_user_invitations_handler),
        )
        .route(
            "/api/invitations/{invitation_id}",
            delete(handlers::workspaces::revoke_invitation_handler),
        )
        .route(
            "/api/invitations/{invitation_id}/accept",
            post(handlers::workspaces::accept_invitation_handler),
        )
        .route(
            "/api/workspace/selection",
            get(handlers::workspaces::current_workspace_handler)
                .put(handlers::workspaces::select_workspace_handler),
        )
        .route(
            "/api/profiles/{profile_id}",
            get(handlers::profiles::get_profile_handler),
        )
        .route(
            "/api/profile",
            put(handlers::profiles::update_profile_handler),
        )
        .route(
            "/api/chats",
            get(handlers::chats::list_chats_handler).post(handlers::chats::create_chat_handler),
        )
        .route(
            "/api/chats/{chat_id}",
            get(handlers::chats::get_chat_handler),
        )
        .route(
            "/api/chats/{chat_id}/status",
            put(handlers::chats::update_chat_status_handler),
        )
        .route(
            "/api/chats/{chat_id}/messages",
            put(handlers::chats::save_messages_handler)
                .post(handlers::chats::add_message_handler),
        )
        .route(
            "/api/chats/{chat_id}/send",
            post(handlers::chats::send_message_handler),
        )
        .route(
            "/api/agents",
            get(handlers::tasks::list_agents_handler).post(handlers::tasks::create_agent_handler),
        )
        .route(
            "/api/agents/{agent_id}",
            get(handlers::tasks::get_agent_handler)
                .put(handlers::tasks::update_agent_handler)
                .delete(handlers::tasks::delete_agent_handler),
        )
        .route(
            "/api/tasks",
            get(handlers::tasks::list_tasks_handler).post(handlers::tasks::create_task_handler),
        )
        .route(
            "/api/tasks/{task_id}/status",
            put(handlers::tasks::update_task_status_handler),
        )
        .route(
            "/api/tasks/{task_id}/submit",
            post(handlers::tasks::submit_task_handler),
        )
        .route_layer(from_fn(middleware::require_auth));

    let cors_layer = CorsLayer::new()
        .allow_origin(
            HeaderValue::from_str(&config.frontend_url)
                .map_err(|error| AppError::Internal(format!("invalid FRONTEND_URL: {error}")))?,
        )
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE]);

    let app = Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/auth/session", post(auth::create_session_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .merge(protected_routes)
        .route_layer(from_fn_with_state(
            app_state.clone(),
            middleware::require_same_origin_for_mutations,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .layer(session_layer)
        .with_state(app_state);

    let address = config.socket_address()?;

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .map_err(|error| AppError::Internal(format!("failed to bind listener: {error}")))?;

    info!(%address, "severatee-api listening");

    axum::serve(listener, app)
        .await
        .map_err(|error| AppError::Internal(format!("api server error: {error}")))
}
