//! Application services and ports.

#![forbid(unsafe_code)]

mod chat_service;
mod identity;
mod profile_service;
mod task_service;
mod workspace_ports;
mod workspace_selection;
mod workspace_service;

#[cfg(test)]
mod test_support;

pub use chat_service::{
    ChatCompletionClient, ChatRepository, ChatService, ChatWithMessages, CompletionMessage,
    NewChatMessage,
};
pub use identity::{IdentityProvider, VerifiedIdentity};
pub use profile_service::{NewProfile, ProfileChanges, ProfileRepository, ProfileService};
pub use task_service::{
    AgentChanges, AgentTaskRepository, NewAgentInput, NewTask, NewTaskInput, ProvisionedWallet,
    SubmissionVault, TaskFilter, TaskService, TaskSubmission, TaskWithAgent, WalletProvider,
};
pub use workspace_ports::{
    InvitationRecord, MemberRecord, NewInvitation, NewWorkspace, UserInvitation, WorkspaceChanges,
    WorkspaceMembership, WorkspaceRepository,
};
pub use workspace_selection::{WorkspaceSelectionService, WorkspaceSelectionStore};
pub use workspace_service::{
    CreateInvitationInput, CreateWorkspaceInput, EmailService, InvitationEmail, InvitationPolicy,
    UpdateWorkspaceInput, WorkspaceAccess, WorkspaceService,
};
