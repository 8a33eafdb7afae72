//! Refresh token storage layered on [`KeychainProvider`].
//!
//! One entry per redirect URI under the configured keychain service holds
//! the JSON-encoded [`RefreshTokenRecord`]. Keychain calls block on the
//! platform backend (D-Bus on Linux), so each one runs on the blocking pool.

use async_trait::async_trait;
use tracing::debug;

use super::traits::{TokenStore, TokenStoreError};
use super::types::RefreshTokenRecord;
use crate::security::{KeychainError, KeychainProvider};

impl From<KeychainError> for TokenStoreError {
    fn from(err: KeychainError) -> Self {
        match err {
            KeychainError::Serialization(e) => Self::Corrupt(e.to_string()),
            other => Self::Access(other.to_string()),
        }
    }
}

/// Keychain-backed [`TokenStore`].
#[derive(Debug, Clone)]
pub struct KeychainTokenStore {
    keychain: KeychainProvider,
    account: String,
}

impl KeychainTokenStore {
    /// Store records for `redirect_uri` under keychain service `service_name`.
    pub fn new(service_name: impl Into<String>, redirect_uri: &str) -> Self {
        Self {
            keychain: KeychainProvider::new(service_name),
            account: format!("refresh_token@{redirect_uri}"),
        }
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, TokenStoreError>
    where
        T: Send + 'static,
        F: FnOnce(&KeychainProvider, &str) -> Result<T, KeychainError> + Send + 'static,
    {
        let keychain = self.keychain.clone();
        let account = self.account.clone();
        tokio::task::spawn_blocking(move || op(&keychain, &account))
            .await
            .map_err(|e| TokenStoreError::Access(format!("Keychain task failed: {e}")))?
            .map_err(TokenStoreError::from)
    }
}

#[async_trait]
impl TokenStore for KeychainTokenStore {
    async fn load(&self) -> Result<Option<RefreshTokenRecord>, TokenStoreError> {
        debug!(service = %self.keychain.service_name(), account = %self.account, "Reading refresh token");

        self.blocking(|keychain, account| match keychain.get_json(account) {
            Ok(record) => Ok(Some(record)),
            Err(KeychainError::NotFound) => Ok(None),
            Err(e) => Err(e),
        })
        .await
    }

    async fn save(&self, record: &RefreshTokenRecord) -> Result<(), TokenStoreError> {
        let expires_at = record.expires_at;
        let record = record.clone();
        self.blocking(move |keychain, account| keychain.set_json(account, &record)).await?;

        debug!(service = %self.keychain.service_name(), expires_at, "Refresh token stored");
        Ok(())
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        self.blocking(|keychain, account| keychain.delete_secret(account)).await?;
        debug!(service = %self.keychain.service_name(), "Refresh token cleared");
        Ok(())
    }
}
