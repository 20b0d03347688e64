use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::warn;

/// Google OAuth client credentials.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_url: String,
}

/// Process-wide configuration, built once in `main` from the environment and
/// passed by reference into every constructor that needs a piece of it.
/// Business logic never reads ambient environment state.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Secret for signing bearer tokens.
    pub token_secret: String,
    /// Origin of the SPA; used for CORS and OAuth redirects.
    pub client_url: String,
    /// Root directory for uploaded files.
    pub upload_dir: PathBuf,
    /// Absent when the OAuth client credentials are not configured; the
    /// Google routes then fail over to the client's login error view.
    pub google: Option<GoogleConfig>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let token_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;
        let client_url =
            env::var("CLIENT_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let google = match (env::var("GOOGLE_CLIENT_ID"), env::var("GOOGLE_CLIENT_SECRET")) {
            (Ok(client_id), Ok(client_secret)) => Some(GoogleConfig {
                client_id,
                client_secret,
                redirect_url: env::var("GOOGLE_REDIRECT_URL").unwrap_or_else(|_| {
                    "http://localhost:8080/api/auth/google/callback".to_string()
                }),
            }),
            _ => {
                warn!(
                    "GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET not set; \
                     Google sign-in is disabled, email/password login still works"
                );
                None
            }
        };

        Ok(Self {
            database_url,
            token_secret,
            client_url,
            upload_dir,
            google,
        })
    }
}
