//! Shared OAuth building blocks for AuthDesk crates.
//!
//! # Feature Tiers
//!
//! - default: PKCE, wire types, token endpoint client, token store trait
//! - `platform`: system keychain token store (`keyring`)
//! - `test-utils`: in-memory doubles for the token store and token endpoint

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod auth;
#[cfg(feature = "platform")]
pub mod security;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", test))]
pub mod testing;

pub use auth::{
    AuthorizeRequest, GrantRequest, HttpTokenClient, OAuthError, PkcePair, RefreshTokenRecord,
    TokenClientError, TokenEndpoint, TokenGrant, TokenResponse, TokenStore, TokenStoreError,
};
