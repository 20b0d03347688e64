use serde::{Deserialize, Serialize};

/// External OAuth provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
    pub scopes: Vec<String>,
}

/// What the identity provider asserted about the person who just signed in.
///
/// `subject` is the provider-scoped stable identifier; `email` is the
/// provider-verified address the platform links accounts on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityAssertion {
    pub subject: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

/// Raw userinfo payload as Google returns it.
#[derive(Debug, Deserialize)]
pub(crate) struct UserInfoResponse {
    pub sub: String,
    pub email: Option<String>,
    #[allow(dead_code)]
    pub email_verified: Option<bool>,
    pub name: Option<String>,
    pub picture: Option<String>,
}
