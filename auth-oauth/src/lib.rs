//! External identity provider round trip for the Arovia platform
//!
//! Implements the client half of the OAuth 2.0 authorization-code flow
//! against Google, with CSRF state validation and PKCE. The crate knows
//! nothing about accounts: it turns a callback `(code, state)` pair into a
//! verified [`IdentityAssertion`] and leaves linking/creation to the caller.

pub mod client;
pub mod error;
pub mod models;

pub use client::OAuthClient;
pub use error::{OAuthError, Result};
pub use models::{IdentityAssertion, OAuthProviderConfig};
