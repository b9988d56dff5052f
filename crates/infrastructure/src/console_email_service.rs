//! Console email service for development. Logs invitations to tracing
//! output.

use async_trait::async_trait;
use severatee_application::{EmailService, InvitationEmail};
use severatee_core::AppResult;
use tracing::info;

/// Development email service that logs invitations to the console.
#[derive(Clone)]
pub struct ConsoleEmailService;

impl ConsoleEmailService {
    /// Creates a new console email service.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for ConsoleEmailService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmailService for ConsoleEmailService {
    async fn send_workspace_invitation(&self, email: &InvitationEmail) -> AppResult<()> {
        info!(
            to = email.to,
            workspace = email.workspace_name,
            role = email.role.as_str(),
            "--- INVITATION EMAIL (console) ---\n\
             To: {}\n\
             {} invited you to join '{}' as {}.\n\
             Accept: {}\n\
             Expires: {}\n\
             --- END EMAIL ---",
            email.to,
            email.inviter_name,
            email.workspace_name,
            email.role.as_str(),
            email.accept_url,
            email.expires_at.to_rfc3339(),
        );

        Ok(())
    }
}
