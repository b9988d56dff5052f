//! Last-selected-workspace state holder.
//!
//! Replaces the ambient browser-storage mechanic with an explicit store the
//! API owns: one `last_workspace_id` row per user. The fallback rules mirror
//! the frontend behavior: a stale selection is bypassed (not deleted), and
//! the first workspace by creation time is used when nothing valid is
//! stored.

use std::sync::Arc;

use async_trait::async_trait;
use severatee_core::{AppError, AppResult, UserId, UserIdentity, WorkspaceId};
use severatee_domain::permissions_for;

use crate::workspace_ports::WorkspaceRepository;
use crate::workspace_service::WorkspaceAccess;

/// Port persisting the `last_workspace_id` value per user.
#[async_trait]
pub trait WorkspaceSelectionStore: Send + Sync {
    /// Returns the stored selection, if any.
    async fn last_selected(&self, user_id: UserId) -> AppResult<Option<WorkspaceId>>;

    /// Upserts the stored selection.
    async fn save_selection(&self, user_id: UserId, workspace_id: WorkspaceId) -> AppResult<()>;
}

/// Application service resolving the caller's current workspace.
#[derive(Clone)]
pub struct WorkspaceSelectionService {
    store: Arc<dyn WorkspaceSelectionStore>,
    repository: Arc<dyn WorkspaceRepository>,
}

impl WorkspaceSelectionService {
    /// Creates a new selection service.
    #[must_use]
    pub fn new(
        store: Arc<dyn WorkspaceSelectionStore>,
        repository: Arc<dyn WorkspaceRepository>,
    ) -> Self {
        Self { store, repository }
    }

    /// Resolves the caller's current workspace.
    ///
    /// Returns the stored selection when it still refers to an active
    /// membership in a live workspace, otherwise the first workspace by
    /// creation time, or `None` when the caller has no memberships.
    pub async fn current(&self, actor: &UserIdentity) -> AppResult<Option<WorkspaceAccess>> {
        let memberships = self
            .repository
            .list_workspaces_for_user(actor.user_id())
            .await?;

        if memberships.is_empty() {
            return Ok(None);
        }

        let stored = self.store.last_selected(actor.user_id()).await?;
        let chosen = stored
            .and_then(|workspace_id| {
                memberships
                    .iter()
                    .find(|membership| membership.workspace.id == workspace_id)
            })
            .or_else(|| memberships.first());

        Ok(chosen.map(|membership| WorkspaceAccess {
            workspace: membership.workspace.clone(),
            role: membership.role,
            permissions: permissions_for(membership.role).to_vec(),
        }))
    }

    /// Stores a new selection for the caller.
    ///
    /// Fails `Forbidden` when the caller holds no active membership in the
    /// target workspace.
    pub async fn select(
        &self,
        actor: &UserIdentity,
        workspace_id: WorkspaceId,
    ) -> AppResult<WorkspaceAccess> {
        let memberships = self
            .repository
            .list_workspaces_for_user(actor.user_id())
            .await?;

        let membership = memberships
            .into_iter()
            .find(|membership| membership.workspace.id == workspace_id)
            .ok_or_else(|| {
                AppError::Forbidden(
                    "cannot select a workspace without an active membership".to_owned(),
                )
            })?;

        self.store
            .save_selection(actor.user_id(), workspace_id)
            .await?;

        Ok(WorkspaceAccess {
            role: membership.role,
            permissions: permissions_for(membership.role).to_vec(),
            workspace: membership.workspace,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use severatee_core::{UserId, UserIdentity, WorkspaceId};
    use severatee_domain::Role;

    use crate::test_support::FakeStore;
    use crate::workspace_ports::{NewWorkspace, WorkspaceRepository};

    use super::{WorkspaceSelectionService, WorkspaceSelectionStore};

    fn identity(user_id: UserId) -> UserIdentity {
        UserIdentity::new(user_id, "U", Some("u@acme.example".to_owned()))
    }

    async fn workspace_for(store: &FakeStore, user_id: UserId, name: &str) -> WorkspaceId {
        let created = store
            .create_workspace_with_owner(NewWorkspace {
                name: name.to_owned(),
                slug: None,
                description: None,
                created_by: user_id,
            })
            .await;
        created
            .map(|(workspace, _)| workspace.id)
            .unwrap_or_else(|error| panic!("workspace creation failed: {error}"))
    }

    #[tokio::test]
    async fn no_memberships_resolves_to_none() {
        let store = Arc::new(FakeStore::new());
        let service = WorkspaceSelectionService::new(store.clone(), store);

        let current = service.current(&identity(UserId::new())).await;
        assert!(matches!(current, Ok(None)));
    }

    #[tokio::test]
    async fn falls_back_to_first_workspace_when_nothing_stored() {
        let store = Arc::new(FakeStore::new());
        let user_id = UserId::new();
        let first = workspace_for(&store, user_id, "First").await;
        let _second = workspace_for(&store, user_id, "Second").await;
        let service = WorkspaceSelectionService::new(store.clone(), store);

        let current = service.current(&identity(user_id)).await;
        assert_eq!(
            current.ok().flatten().map(|access| access.workspace.id),
            Some(first)
        );
    }

    #[tokio::test]
    async fn stored_selection_wins_when_still_valid() {
        let store = Arc::new(FakeStore::new());
        let user_id = UserId::new();
        let _first = workspace_for(&store, user_id, "First").await;
        let second = workspace_for(&store, user_id, "Second").await;
        let service = WorkspaceSelectionService::new(store.clone(), store);
        let actor = identity(user_id);

        let selected = service.select(&actor, second).await;
        assert!(selected.is_ok());
        assert_eq!(selected.ok().map(|access| access.role), Some(Role::Owner));

        let current = service.current(&actor).await;
        assert_eq!(
            current.ok().flatten().map(|access| access.workspace.id),
            Some(second)
        );
    }

    #[tokio::test]
    async fn stale_selection_is_bypassed() {
        let store = Arc::new(FakeStore::new());
        let user_id = UserId::new();
        let first = workspace_for(&store, user_id, "First").await;
        let service = WorkspaceSelectionService::new(store.clone(), store.clone());
        let actor = identity(user_id);

        // Point the stored selection at a workspace the user never joined.
        let saved = store.save_selection(user_id, WorkspaceId::new()).await;
        assert!(saved.is_ok());

        let current = service.current(&actor).await;
        assert_eq!(
            current.ok().flatten().map(|access| access.workspace.id),
            Some(first)
        );
    }

    #[tokio::test]
    async fn selecting_foreign_workspace_is_forbidden() {
        let store = Arc::new(FakeStore::new());
        let owner = UserId::new();
        let outsider = UserId::new();
        let workspace_id = workspace_for(&store, owner, "W").await;
        let service = WorkspaceSelectionService::new(store.clone(), store);

        let result = service.select(&identity(outsider), workspace_id).await;
        assert!(result.is_err());
    }
}
