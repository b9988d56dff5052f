use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use severatee_application::InvitationPolicy;
use severatee_core::AppError;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Debug, Clone)]
pub struct SmtpRuntimeConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub enum EmailProviderConfig {
    Console,
    Smtp(SmtpRuntimeConfig),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub migrate_only: bool,
    pub database_url: String,
    pub frontend_url: String,
    pub api_host: String,
    pub api_port: u16,
    pub cookie_secure: bool,
    pub identity_provider_url: String,
    pub identity_provider_key: String,
    pub chat_api_url: String,
    pub chat_api_key: String,
    pub chat_model: String,
    pub vault_api_url: String,
    pub vault_api_token: String,
    pub vault_schema_id: String,
    pub wallet_api_url: String,
    pub wallet_app_id: String,
    pub wallet_app_secret: String,
    pub invitation_policy: InvitationPolicy,
    pub email_provider: EmailProviderConfig,
}

impl ApiConfig {
    pub fn load() -> Result<Self, AppError> {
        let migrate_only = env::args().nth(1).as_deref() == Some("migrate");

        let database_url = required_env("DATABASE_URL")?;
        let frontend_url =
            env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:3000".to_owned());

        let api_host = env::var("API_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
        let api_port = env::var("API_PORT")
            .ok()
            .and_then(|value| value.parse::<u16>().ok())
            .unwrap_or(3001);
        let cookie_secure = env::var("SESSION_COOKIE_SECURE")
            .unwrap_or_else(|_| "false".to_owned())
            .eq_ignore_ascii_case("true");

        let identity_provider_url = required_base_url("IDENTITY_PROVIDER_URL")?;
        let identity_provider_key = required_env("IDENTITY_PROVIDER_KEY")?;

        let chat_api_url = required_base_url("CHAT_API_URL")?;
        let chat_api_key = required_env("CHAT_API_KEY")?;
        let chat_model =
            env::var("CHAT_MODEL").unwrap_or_else(|_| "llama-3.1-8b-instruct".to_owned());

        let vault_api_url = required_base_url("VAULT_API_URL")?;
        let vault_api_token = required_env("VAULT_API_TOKEN")?;
        let vault_schema_id = required_env("VAULT_SCHEMA_ID")?;

        let wallet_api_url = required_base_url("WALLET_API_URL")?;
        let wallet_app_id = required_env("WALLET_APP_ID")?;
        let wallet_app_secret = required_env("WALLET_APP_SECRET")?;

        let invitation_policy = InvitationPolicy {
            require_email_match: bool_env("INVITATIONS_REQUIRE_EMAIL_MATCH", true),
            enforce_expiry: bool_env("INVITATIONS_ENFORCE_EXPIRY", true),
        };

        let email_provider = match env::var("EMAIL_PROVIDER")
            .unwrap_or_else(|_| "console".to_owned())
            .as_str()
        {
            "console" => EmailProviderConfig::Console,
            "smtp" => {
                let port = required_non_empty_env("SMTP_PORT")?
                    .parse::<u16>()
                    .map_err(|error| AppError::Validation(format!("invalid SMTP_PORT: {error}")))?;
                EmailProviderConfig::Smtp(SmtpRuntimeConfig {
                    host: required_non_empty_env("SMTP_HOST")?,
                    port,
                    username: required_non_empty_env("SMTP_USERNAME")?,
                    password: required_non_empty_env("SMTP_PASSWORD")?,
                    from_address: required_non_empty_env("SMTP_FROM_ADDRESS")?,
                })
            }
            other => {
                return Err(AppError::Validation(format!(
                    "EMAIL_PROVIDER must be either 'console' or 'smtp', got '{other}'"
                )));
            }
        };

        Ok(Self {
            migrate_only,
            database_url,
            frontend_url,
            api_host,
            api_port,
            cookie_secure,
            identity_provider_url,
            identity_provider_key,
            chat_api_url,
            chat_api_key,
            chat_model,
            vault_api_url,
            vault_api_token,
            vault_schema_id,
            wallet_api_url,
            wallet_app_id,
            wallet_app_secret,
            invitation_policy,
            email_provider,
        })
    }

    pub fn socket_address(&self) -> Result<SocketAddr, AppError> {
        let host = IpAddr::from_str(&self.api_host).map_err(|error| {
            AppError::Internal(format!("invalid API_HOST '{}': {error}", self.api_host))
        })?;
        Ok(SocketAddr::from((host, self.api_port)))
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> Result<String, AppError> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn required_non_empty_env(name: &str) -> Result<String, AppError> {
    let value = required_env(name)?;
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{name} must not be empty")));
    }

    Ok(value)
}

/// Reads a base URL, validating it and stripping any trailing slash.
fn required_base_url(name: &str) -> Result<String, AppError> {
    let value = required_non_empty_env(name)?;
    Url::parse(&value).map_err(|error| AppError::Validation(format!("invalid {name}: {error}")))?;
    Ok(value.trim_end_matches('/').to_owned())
}

fn bool_env(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|value| value.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
