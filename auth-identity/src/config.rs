use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Secret used to sign and verify bearer tokens.
    pub token_secret: String,
    /// Token lifetime in hours. Expiry is fixed per token.
    pub token_ttl_hours: i64,
}

impl IdentityConfig {
    pub fn new(token_secret: impl Into<String>) -> Self {
        Self {
            token_secret: token_secret.into(),
            token_ttl_hours: 24,
        }
    }
}
