use crate::error::*;
use crate::models::{IdentityAssertion, OAuthProviderConfig, UserInfoResponse};
use chrono::{DateTime, Duration, Utc};
use oauth2::{
    basic::BasicClient, reqwest::async_http_client, AuthUrl, AuthorizationCode, ClientId,
    ClientSecret, CsrfToken, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// Google OAuth 2.0 endpoints.
pub mod google {
    pub const AUTHORIZATION_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
    pub const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
    pub const USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
    pub const DEFAULT_SCOPES: &[&str] = &["openid", "email", "profile"];
}

/// Outstanding authorization redirects, keyed by CSRF state.
#[derive(Debug, Clone)]
struct PendingAuthorization {
    verifier: String,
    created_at: DateTime<Utc>,
}

// A browser that sits on the consent screen longer than this has to start over.
const PENDING_TTL_MINUTES: i64 = 10;

/// OAuth client for the external identity provider.
///
/// One instance per process. The pending-state cache lives in memory, which
/// is adequate for the single-process deployment this platform targets.
pub struct OAuthClient {
    client: BasicClient,
    http: reqwest::Client,
    scopes: Vec<String>,
    pending: RwLock<HashMap<String, PendingAuthorization>>,
}

impl OAuthClient {
    /// Build a client for Google with the platform's default scopes.
    pub fn google(client_id: String, client_secret: String, redirect_url: String) -> Result<Self> {
        Self::new(OAuthProviderConfig {
            client_id,
            client_secret,
            redirect_url,
            scopes: google::DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        })
    }

    pub fn new(config: OAuthProviderConfig) -> Result<Self> {
        let auth_url = AuthUrl::new(google::AUTHORIZATION_URL.to_string())
            .map_err(|e| OAuthError::Configuration(format!("authorization endpoint: {e}")))?;
        let token_url = TokenUrl::new(google::TOKEN_URL.to_string())
            .map_err(|e| OAuthError::Configuration(format!("token endpoint: {e}")))?;
        let redirect_url = RedirectUrl::new(config.redirect_url.clone())
            .map_err(|e| OAuthError::Configuration(format!("redirect URI: {e}")))?;

        let client = BasicClient::new(
            ClientId::new(config.client_id),
            Some(ClientSecret::new(config.client_secret)),
            auth_url,
            Some(token_url),
        )
        .set_redirect_uri(redirect_url);

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| OAuthError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            http,
            scopes: config.scopes,
            pending: RwLock::new(HashMap::new()),
        })
    }

    /// First half of the round trip: the URL to send the browser to.
    ///
    /// Returns `(url, state)`. The PKCE verifier is cached against the state
    /// until the provider calls back.
    pub async fn authorization_url(&self) -> String {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .set_pkce_challenge(pkce_challenge)
            .add_scopes(self.scopes.iter().map(|s| Scope::new(s.clone())))
            .url();

        let state = csrf_state.secret().clone();
        {
            let mut pending = self.pending.write().await;
            pending.retain(|_, p| Utc::now() - p.created_at < Duration::minutes(PENDING_TTL_MINUTES));
            pending.insert(
                state,
                PendingAuthorization {
                    verifier: pkce_verifier.secret().clone(),
                    created_at: Utc::now(),
                },
            );
        }

        url.to_string()
    }

    /// Second half: the assertion-received transition.
    ///
    /// Consumes the state (a second callback with the same state fails),
    /// exchanges the code, and fetches userinfo. The returned assertion
    /// always carries an email.
    pub async fn exchange(&self, code: &str, state: &str) -> Result<IdentityAssertion> {
        let pending = {
            let mut cache = self.pending.write().await;
            cache.remove(state).ok_or(OAuthError::UnknownState)?
        };

        if Utc::now() - pending.created_at > Duration::minutes(PENDING_TTL_MINUTES) {
            return Err(OAuthError::StateExpired);
        }

        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pending.verifier))
            .request_async(async_http_client)
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?;

        let userinfo = self.fetch_userinfo(token.access_token().secret()).await?;
        debug!(subject = %userinfo.sub, "identity assertion received");

        let email = userinfo.email.ok_or(OAuthError::MissingEmail)?;
        Ok(IdentityAssertion {
            subject: userinfo.sub,
            email,
            name: userinfo.name,
            picture: userinfo.picture,
        })
    }

    async fn fetch_userinfo(&self, access_token: &str) -> Result<UserInfoResponse> {
        let response = self
            .http
            .get(google::USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| OAuthError::UserInfo(e.to_string()))?;

        if !response.status().is_success() {
            return Err(OAuthError::UserInfo(format!(
                "userinfo endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<UserInfoResponse>()
            .await
            .map_err(|e| OAuthError::UserInfo(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> OAuthClient {
        OAuthClient::google(
            "client-id".into(),
            "client-secret".into(),
            "http://localhost:8080/api/auth/google/callback".into(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn authorization_url_carries_state_and_caches_it() {
        let client = client();
        let url = client.authorization_url().await;

        assert!(url.starts_with(google::AUTHORIZATION_URL));
        assert!(url.contains("code_challenge="));
        assert!(url.contains("scope="));

        let state = url
            .split('&')
            .find_map(|kv| kv.strip_prefix("state="))
            .expect("state parameter present")
            .to_string();
        assert!(client.pending.read().await.contains_key(&state));
    }

    #[tokio::test]
    async fn callback_with_unknown_state_is_rejected() {
        let client = client();
        assert!(matches!(
            client.exchange("some-code", "never-issued").await,
            Err(OAuthError::UnknownState)
        ));
    }

    #[tokio::test]
    async fn state_is_single_use() {
        let client = client();
        let url = client.authorization_url().await;
        let state = url
            .split('&')
            .find_map(|kv| kv.strip_prefix("state="))
            .unwrap()
            .to_string();

        // Expire the entry so the first use fails deterministically without
        // a network round trip, then confirm the state was still consumed.
        client
            .pending
            .write()
            .await
            .get_mut(&state)
            .unwrap()
            .created_at = Utc::now() - Duration::minutes(PENDING_TTL_MINUTES + 1);

        assert!(matches!(
            client.exchange("code", &state).await,
            Err(OAuthError::StateExpired)
        ));
        assert!(matches!(
            client.exchange("code", &state).await,
            Err(OAuthError::UnknownState)
        ));
    }
}
