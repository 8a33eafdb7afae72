//! OAuth 2.0 + PKCE building blocks
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ Auth Orchestrator│  (authdesk-core)
//! └────────┬─────────┘
//!          │
//!          ├──► TokenEndpoint   (HttpTokenClient: code / refresh grants)
//!          ├──► TokenStore      (KeychainTokenStore: one refresh token)
//!          └──► PKCE utilities  (verifier, challenge, state)
//! ```
//!
//! # Module Organization
//!
//! - **[`pkce`]**: verifier/challenge/state generation and state validation
//! - **[`types`]**: authorize URL builder, grant forms, token responses,
//!   persisted refresh token record
//! - **[`client`]**: HTTP token endpoint client
//! - **[`traits`]**: `TokenEndpoint` and `TokenStore` seams
//! - `keychain` (feature `platform`): token store on top of
//!   `security::KeychainProvider`

pub mod client;
#[cfg(feature = "platform")]
pub mod keychain;
pub mod pkce;
pub mod traits;
pub mod types;

pub use client::{HttpTokenClient, TokenClientError};
#[cfg(feature = "platform")]
pub use keychain::KeychainTokenStore;
pub use pkce::{generate_code_challenge, generate_code_verifier, generate_state, validate_state};
pub use pkce::PkcePair;
pub use traits::{TokenEndpoint, TokenStore, TokenStoreError};
pub use types::{
    AuthorizeRequest, GrantRequest, OAuthError, RefreshTokenRecord, TokenGrant, TokenResponse,
};
