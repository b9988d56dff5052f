use std::sync::Arc;

use severatee_application::{
    ChatService, IdentityProvider, ProfileService, TaskService, WorkspaceSelectionService,
    WorkspaceService,
};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub workspace_service: WorkspaceService,
    pub selection_service: WorkspaceSelectionService,
    pub profile_service: ProfileService,
    pub chat_service: ChatService,
    pub task_service: TaskService,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub frontend_url: String,
}
