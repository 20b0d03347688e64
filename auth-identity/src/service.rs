use crate::{config::IdentityConfig, error::*};
use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims embedded in a bearer token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Account identifier.
    sub: String,
    /// Issued-at, seconds since epoch.
    iat: i64,
    /// Expiry, seconds since epoch. Fixed at issue time, never renewed.
    exp: i64,
}

/// Hashes and verifies passwords, issues and validates bearer tokens.
///
/// Construct one per process from the configuration object built at startup
/// and share it behind an `Arc`; it holds no mutable state.
pub struct CredentialService {
    config: IdentityConfig,
    argon2: Argon2<'static>,
}

impl CredentialService {
    pub fn new(config: IdentityConfig) -> Self {
        Self {
            config,
            argon2: Argon2::default(),
        }
    }

    /// Produce a salted, one-way digest of `plaintext`.
    pub fn hash(&self, plaintext: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|_| IdentityError::Hashing)?
            .to_string();
        Ok(digest)
    }

    /// Check `plaintext` against a stored digest.
    ///
    /// Comparison goes through the hashing library's own verifier; raw
    /// strings are never compared. A digest that does not parse is an error
    /// rather than a mismatch, so a corrupted store surfaces loudly.
    pub fn verify(&self, plaintext: &str, digest: &str) -> Result<bool> {
        let parsed = PasswordHash::new(digest).map_err(|_| IdentityError::MalformedDigest)?;
        Ok(self
            .argon2
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok())
    }

    /// Sign a token for `account_id` expiring `token_ttl_hours` from now.
    pub fn issue_token(&self, account_id: Uuid) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.config.token_ttl_hours)).timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.token_secret.as_bytes()),
        )
        .map_err(|e| IdentityError::TokenSigning(e.to_string()))
    }

    /// Validate a token and return the embedded account identifier.
    ///
    /// Rejects on signature mismatch, malformed structure, or expiry.
    pub fn verify_token(&self, token: &str) -> Result<Uuid> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.token_secret.as_bytes()),
            &Self::validation(),
        )
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => IdentityError::TokenExpired,
            _ => IdentityError::InvalidToken,
        })?;

        Uuid::parse_str(&data.claims.sub).map_err(|_| IdentityError::InvalidToken)
    }

    // Zero leeway: the expiry boundary is exact.
    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation
    }
}
