//! Generic keychain provider for secret storage
//!
//! Thin wrapper over the platform keychain (macOS Keychain, Windows
//! Credential Manager, Linux Secret Service) through `keyring`. Every call
//! blocks on the platform backend; async callers go through
//! `tokio::task::spawn_blocking`.
//!
//! ```no_run
//! use authdesk_common::security::KeychainProvider;
//!
//! let keychain = KeychainProvider::new("authdesk");
//! keychain.set_secret("service_account", "super-secret")?;
//! assert_eq!(keychain.get_secret("service_account")?, "super-secret");
//! # Ok::<(), authdesk_common::security::KeychainError>(())
//! ```

use keyring::Entry;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

/// Keychain error type
#[derive(Debug, Error)]
pub enum KeychainError {
    /// Keychain access failed (permission denied, backend unavailable, ...)
    #[error("Keychain access failed: {0}")]
    AccessFailed(String),

    #[error("Entry not found")]
    NotFound,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Secrets stored under one keychain service name.
#[derive(Debug, Clone)]
pub struct KeychainProvider {
    service_name: String,
}

impl KeychainProvider {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self { service_name: service_name.into() }
    }

    #[must_use]
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Store a secret value.
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if keychain access fails
    pub fn set_secret(&self, key: &str, value: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Storing secret in keychain");

        self.entry(key)?.set_password(value).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to store secret for {key}: {e}"))
        })
    }

    /// Retrieve a secret value.
    ///
    /// # Errors
    /// Returns `KeychainError::NotFound` if the secret doesn't exist, or
    /// `KeychainError::AccessFailed` if keychain access fails
    pub fn get_secret(&self, key: &str) -> Result<String, KeychainError> {
        debug!(service = %self.service_name, key = %key, "Retrieving secret from keychain");

        self.entry(key)?.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => KeychainError::NotFound,
            e => KeychainError::AccessFailed(format!("Failed to retrieve secret for {key}: {e}")),
        })
    }

    /// Delete a secret (idempotent).
    ///
    /// # Errors
    /// Returns `KeychainError::AccessFailed` if keychain access fails
    pub fn delete_secret(&self, key: &str) -> Result<(), KeychainError> {
        debug!(service = %self.service_name, key = %key, "Deleting secret from keychain");

        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(KeychainError::AccessFailed(format!(
                "Failed to delete secret for {key}: {e}"
            ))),
        }
    }

    /// Store `value` as JSON.
    ///
    /// # Errors
    /// Returns `KeychainError::Serialization` or `KeychainError::AccessFailed`
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), KeychainError> {
        let raw = serde_json::to_string(value)?;
        self.set_secret(key, &raw)
    }

    /// Read a JSON value stored with [`set_json`](Self::set_json).
    ///
    /// # Errors
    /// Returns `KeychainError::NotFound`, `KeychainError::Serialization` or
    /// `KeychainError::AccessFailed`
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<T, KeychainError> {
        let raw = self.get_secret(key)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn entry(&self, key: &str) -> Result<Entry, KeychainError> {
        Entry::new(&self.service_name, key).map_err(|e| {
            KeychainError::AccessFailed(format!("Failed to create keychain entry: {e}"))
        })
    }
}
