use thiserror::Error;

#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("Invalid provider configuration: {0}")]
    Configuration(String),

    #[error("Unknown or already-used state parameter")]
    UnknownState,

    #[error("State parameter has expired")]
    StateExpired,

    #[error("Code exchange failed: {0}")]
    Exchange(String),

    #[error("Userinfo request failed: {0}")]
    UserInfo(String),

    #[error("Identity provider did not supply an email address")]
    MissingEmail,
}

pub type Result<T> = std::result::Result<T, OAuthError>;
