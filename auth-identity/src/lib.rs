//! Credential service for the Arovia platform
//!
//! This crate owns the two credential primitives every authenticated route
//! depends on:
//! - Password digests: salted argon2 hashing and library-driven verification
//! - Bearer tokens: compact signed tokens embedding the account identifier,
//!   with a fixed expiry and no sliding renewal
//!
//! # Example
//!
//! ```rust
//! use auth_identity::{CredentialService, IdentityConfig};
//! use uuid::Uuid;
//!
//! # fn main() -> Result<(), auth_identity::IdentityError> {
//! let service = CredentialService::new(IdentityConfig {
//!     token_secret: "dev-secret".into(),
//!     token_ttl_hours: 24,
//! });
//!
//! let digest = service.hash("hunter2hunter2")?;
//! assert!(service.verify("hunter2hunter2", &digest)?);
//!
//! let account_id = Uuid::new_v4();
//! let token = service.issue_token(account_id)?;
//! assert_eq!(service.verify_token(&token)?, account_id);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod service;

pub use config::IdentityConfig;
pub use error::{IdentityError, Result};
pub use service::CredentialService;
