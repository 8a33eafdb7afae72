//! Configuration management

use serde::{Deserialize, Serialize};
use url::Url;

use crate::constants::{
    CATCHER_PLACEHOLDER_BODY, DEFAULT_AUTHORITY, DEFAULT_CATCHER_HOST, DEFAULT_CATCHER_PORT,
    DEFAULT_CATCHER_PROTOCOL, DEFAULT_LOGOUT_TENANT, DEFAULT_REFRESH_TOKEN_TTL_DAYS,
    DEFAULT_STORAGE_SERVICE, OAUTH_PATH_PREFIX,
};
use crate::errors::{AuthDeskError, Result};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub identity: IdentityConfig,
    #[serde(default)]
    pub catcher: CatcherConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Identity provider (authorization server) configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Base URL of the authority, without a trailing slash.
    #[serde(default = "default_authority")]
    pub authority: String,
    pub tenant_id: String,
    pub client_id: String,
    /// Space-separated scopes.
    pub scope: String,
    /// Tenant segment used for the logout endpoint.
    #[serde(default = "default_logout_tenant")]
    pub logout_tenant: String,
}

/// Local redirect catcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatcherConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub placeholder_body: String,
}

/// Refresh token storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Keychain service namespace.
    pub service_name: String,
    pub refresh_token_ttl_days: i64,
}

fn default_authority() -> String {
    DEFAULT_AUTHORITY.to_string()
}

fn default_logout_tenant() -> String {
    DEFAULT_LOGOUT_TENANT.to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            authority: default_authority(),
            tenant_id: String::new(),
            client_id: String::new(),
            scope: "openid offline_access".to_string(),
            logout_tenant: default_logout_tenant(),
        }
    }
}

impl Default for CatcherConfig {
    fn default() -> Self {
        Self {
            protocol: DEFAULT_CATCHER_PROTOCOL.to_string(),
            host: DEFAULT_CATCHER_HOST.to_string(),
            port: DEFAULT_CATCHER_PORT,
            placeholder_body: CATCHER_PLACEHOLDER_BODY.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_STORAGE_SERVICE.to_string(),
            refresh_token_ttl_days: DEFAULT_REFRESH_TOKEN_TTL_DAYS,
        }
    }
}

impl IdentityConfig {
    fn endpoint(&self, tenant: &str, leaf: &str) -> String {
        format!("{}/{}/{}/{}", self.authority.trim_end_matches('/'), tenant, OAUTH_PATH_PREFIX, leaf)
    }

    /// `{authority}/{tenant}/oauth2/v2.0/authorize`
    #[must_use]
    pub fn authorize_endpoint(&self) -> String {
        self.endpoint(&self.tenant_id, "authorize")
    }

    /// `{authority}/{tenant}/oauth2/v2.0/token`
    #[must_use]
    pub fn token_endpoint(&self) -> String {
        self.endpoint(&self.tenant_id, "token")
    }

    /// `{authority}/{logout_tenant}/oauth2/v2.0/logout`
    #[must_use]
    pub fn logout_endpoint(&self) -> String {
        self.endpoint(&self.logout_tenant, "logout")
    }
}

impl CatcherConfig {
    /// Redirect URI registered with the identity provider.
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// Parsed form of [`Self::redirect_uri`].
    ///
    /// # Errors
    /// Returns `AuthDeskError::Config` if protocol or host do not form a URL.
    pub fn redirect_url(&self) -> Result<Url> {
        Url::parse(&self.redirect_uri())
            .map_err(|e| AuthDeskError::Config(format!("Invalid redirect URI: {e}")))
    }
}

impl Config {
    /// Check required fields.
    ///
    /// # Errors
    /// Returns `AuthDeskError::Config` naming the first invalid field.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("identity.tenant_id", &self.identity.tenant_id),
            ("identity.client_id", &self.identity.client_id),
            ("identity.scope", &self.identity.scope),
            ("identity.authority", &self.identity.authority),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(AuthDeskError::Config(format!("{name} must not be empty")));
            }
        }

        Url::parse(&self.identity.authority)
            .map_err(|e| AuthDeskError::Config(format!("Invalid identity.authority: {e}")))?;

        if self.catcher.port == 0 {
            return Err(AuthDeskError::Config(
                "catcher.port must be a fixed, non-zero port".to_string(),
            ));
        }
        self.catcher.redirect_url()?;

        if self.storage.refresh_token_ttl_days <= 0 {
            return Err(AuthDeskError::Config(
                "storage.refresh_token_ttl_days must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
