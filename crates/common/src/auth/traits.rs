//! Traits for token endpoint and token storage operations
//!
//! These traits enable dependency injection and testing by abstracting
//! external dependencies (identity provider, secure storage medium).

use async_trait::async_trait;
use authdesk_domain::AuthDeskError;
use thiserror::Error;

use super::client::TokenClientError;
use super::types::{GrantRequest, RefreshTokenRecord, TokenGrant};

/// Trait for token endpoint operations
#[async_trait]
pub trait TokenEndpoint: Send + Sync {
    /// POST one grant to the token endpoint.
    ///
    /// # Errors
    /// Returns error on transport failure, non-2xx status, unparsable body
    /// or a body with an `error` field.
    async fn exchange(&self, grant: GrantRequest) -> Result<TokenGrant, TokenClientError>;
}

/// Error type for token storage
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenStoreError {
    #[error("Storage access failed: {0}")]
    Access(String),

    #[error("Stored record is corrupt: {0}")]
    Corrupt(String),
}

impl From<TokenStoreError> for AuthDeskError {
    fn from(err: TokenStoreError) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Single-slot refresh token persistence.
///
/// The slot is keyed by a fixed namespace chosen at construction; the
/// orchestrator is the only writer.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Read the stored record, `Ok(None)` when nothing is stored.
    async fn load(&self) -> Result<Option<RefreshTokenRecord>, TokenStoreError>;

    /// Replace the stored record.
    async fn save(&self, record: &RefreshTokenRecord) -> Result<(), TokenStoreError>;

    /// Erase the stored record (idempotent).
    async fn clear(&self) -> Result<(), TokenStoreError>;
}
