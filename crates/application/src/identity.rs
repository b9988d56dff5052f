//! Port for the hosted identity provider.

use async_trait::async_trait;
use severatee_core::{AppResult, UserId};

/// Identity data returned by the provider for a valid access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedIdentity {
    /// Stable user id issued by the provider.
    pub user_id: UserId,
    /// Verified email, when the provider exposes one.
    pub email: Option<String>,
    /// Display name from the provider's user metadata.
    pub display_name: Option<String>,
}

/// Port for verifying provider-issued access tokens.
///
/// The provider is opaque: credential handling, OAuth flows, and token
/// refresh all happen on its side. An invalid or expired token surfaces as
/// `Unauthorized`.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Verifies an access token and returns the identity it belongs to.
    async fn verify_access_token(&self, access_token: &str) -> AppResult<VerifiedIdentity>;
}
