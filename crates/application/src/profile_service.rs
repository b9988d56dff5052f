//! Profile port and application service.

use std::sync::Arc;

use async_trait::async_trait;
use severatee_core::{AppError, AppResult, UserId, UserIdentity};
use severatee_domain::Profile;

// ---------------------------------------------------------------------------
// Ports
// ---------------------------------------------------------------------------

/// Insert payload for a profile created on first login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    /// Identity provider user id.
    pub id: UserId,
    /// Initial display name.
    pub name: Option<String>,
    /// Verified email from the provider.
    pub email: Option<String>,
}

/// Field changes applied by a profile update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    /// New display name.
    pub name: Option<String>,
    /// New avatar URL.
    pub avatar_url: Option<String>,
    /// New username handle.
    pub username: Option<String>,
}

/// Repository port for profile persistence.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Finds a profile by user id.
    async fn find(&self, user_id: UserId) -> AppResult<Option<Profile>>;

    /// Inserts a new profile row.
    async fn insert(&self, profile: NewProfile) -> AppResult<Profile>;

    /// Applies changes to a profile; unset fields keep their value.
    async fn update(&self, user_id: UserId, changes: ProfileChanges) -> AppResult<Profile>;
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Application service for profile reads and updates.
#[derive(Clone)]
pub struct ProfileService {
    repository: Arc<dyn ProfileRepository>,
}

impl ProfileService {
    /// Creates a new profile service.
    #[must_use]
    pub fn new(repository: Arc<dyn ProfileRepository>) -> Self {
        Self { repository }
    }

    /// Returns a profile by id.
    pub async fn profile(&self, user_id: UserId) -> AppResult<Profile> {
        self.repository
            .find(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile '{user_id}' not found")))
    }

    /// Updates the caller's own profile.
    pub async fn update_profile(
        &self,
        actor: &UserIdentity,
        changes: ProfileChanges,
    ) -> AppResult<Profile> {
        if self.repository.find(actor.user_id()).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "profile '{}' not found",
                actor.user_id()
            )));
        }

        self.repository.update(actor.user_id(), changes).await
    }

    /// Ensures a profile row exists for the session principal.
    ///
    /// Idempotent: called on every session creation, returns the existing
    /// row when present. The email local part seeds the display name when
    /// the provider supplied nothing better.
    pub async fn ensure_profile(&self, actor: &UserIdentity) -> AppResult<Profile> {
        if let Some(existing) = self.repository.find(actor.user_id()).await? {
            return Ok(existing);
        }

        let name = if actor.display_name().is_empty() {
            actor
                .email()
                .and_then(|email| email.split('@').next())
                .map(str::to_owned)
        } else {
            Some(actor.display_name().to_owned())
        };

        self.repository
            .insert(NewProfile {
                id: actor.user_id(),
                name,
                email: actor.email().map(str::to_owned),
            })
            .await
    }
}
