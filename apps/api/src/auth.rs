//! Session handlers: exchange a provider access token for a cookie session.

use axum::Json;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use severatee_core::{AppError, UserIdentity};
use tower_sessions::Session;

use crate::dto::{CreateSessionRequest, UserIdentityResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Session key holding the authenticated [`UserIdentity`].
pub const SESSION_USER_KEY: &str = "severatee.user";

/// Verifies a provider access token and establishes a cookie session.
///
/// The identity provider owns credentials, OAuth flows, and token refresh;
/// this endpoint only converts a still-valid access token into a first-party
/// session and makes sure the profile row exists.
pub async fn create_session_handler(
    State(state): State<AppState>,
    session: Session,
    Json(payload): Json<CreateSessionRequest>,
) -> ApiResult<Json<UserIdentityResponse>> {
    let verified = state
        .identity_provider
        .verify_access_token(&payload.access_token)
        .await?;

    let display_name = verified
        .display_name
        .clone()
        .or_else(|| {
            verified
                .email
                .as_deref()
                .and_then(|email| email.split('@').next())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| verified.user_id.to_string());

    let identity = UserIdentity::new(verified.user_id, display_name, verified.email);

    state.profile_service.ensure_profile(&identity).await?;

    session
        .insert(SESSION_USER_KEY, identity.clone())
        .await
        .map_err(|error| AppError::Internal(format!("failed to persist session: {error}")))?;

    Ok(Json(UserIdentityResponse::from(identity)))
}

pub async fn me_handler(
    Extension(user): Extension<UserIdentity>,
) -> ApiResult<Json<UserIdentityResponse>> {
    Ok(Json(UserIdentityResponse::from(user)))
}

pub async fn logout_handler(session: Session) -> ApiResult<StatusCode> {
    session
        .flush()
        .await
        .map_err(|error| AppError::Internal(format!("failed to destroy session: {error}")))?;

    Ok(StatusCode::NO_CONTENT)
}
