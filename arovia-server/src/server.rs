use crate::config::ServerConfig;
use crate::repository::AccountRepository;
use crate::storage::LocalStorage;
use anyhow::{Context, Result};
use auth_identity::{CredentialService, IdentityConfig};
use auth_oauth::OAuthClient;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

/// Shared server state handed to every handler.
#[derive(Clone)]
pub struct AroviaServer {
    /// Process configuration, built once at startup.
    pub config: Arc<ServerConfig>,
    /// The Account Store.
    pub accounts: AccountRepository,
    /// Password digests and bearer tokens.
    pub credentials: Arc<CredentialService>,
    /// External identity provider client; `None` when not configured.
    pub oauth: Option<Arc<OAuthClient>>,
    /// Local-disk upload store.
    pub storage: Arc<LocalStorage>,
}

impl AroviaServer {
    /// Connect the store, prepare upload directories, and wire the services.
    pub async fn new(config: ServerConfig) -> Result<Self> {
        let accounts = AccountRepository::connect(&config.database_url)
            .await
            .context("failed to connect to the database")?;

        Self::with_parts(config, accounts).await
    }

    /// Build state over an existing pool. Used by the integration tests.
    pub async fn new_with_pool(config: ServerConfig, pool: PgPool) -> Result<Self> {
        Self::with_parts(config, AccountRepository::new(pool)).await
    }

    async fn with_parts(config: ServerConfig, accounts: AccountRepository) -> Result<Self> {
        let storage = LocalStorage::new(&config.upload_dir);
        storage
            .ensure_dirs()
            .await
            .context("failed to create upload directories")?;

        let credentials = CredentialService::new(IdentityConfig::new(config.token_secret.as_str()));

        let oauth = match &config.google {
            Some(google) => {
                let client = OAuthClient::google(
                    google.client_id.clone(),
                    google.client_secret.clone(),
                    google.redirect_url.clone(),
                )
                .context("invalid Google OAuth configuration")?;
                info!("Google OAuth client configured");
                Some(Arc::new(client))
            }
            None => None,
        };

        Ok(Self {
            config: Arc::new(config),
            accounts,
            credentials: Arc::new(credentials),
            oauth,
            storage: Arc::new(storage),
        })
    }
}
