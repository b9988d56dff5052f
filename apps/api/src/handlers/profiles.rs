use axum::Json;
use axum::extract::{Extension, Path, State};
use severatee_application::ProfileChanges;
use severatee_core::{UserId, UserIdentity};
use uuid::Uuid;

use crate::dto::{ProfileResponse, UpdateProfileRequest};
use crate::error::ApiResult;
use crate::state::AppState;

pub async fn get_profile_handler(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = state
        .profile_service
        .profile(UserId::from_uuid(profile_id))
        .await?;

    Ok(Json(ProfileResponse::from(profile)))
}

pub async fn update_profile_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<UpdateProfileRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    let profile = state
        .profile_service
        .update_profile(
            &user,
            ProfileChanges {
                name: payload.name,
                avatar_url: payload.avatar_url,
                username: payload.username,
            },
        )
        .await?;

    Ok(Json(ProfileResponse::from(profile)))
}
