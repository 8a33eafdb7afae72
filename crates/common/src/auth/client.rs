//! Token endpoint client
//!
//! Performs the two grants this application needs against the identity
//! provider's `token` endpoint:
//! - `authorization_code` with the PKCE verifier
//! - `refresh_token` (no verifier)
//!
//! A response counts as a success only when the status is 2xx, the body
//! parses as JSON and it carries no `error` field.

use async_trait::async_trait;
use authdesk_domain::{AuthDeskError, IdentityConfig};
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use super::traits::TokenEndpoint;
use super::types::{GrantRequest, OAuthError, TokenGrant, TokenResponse};

/// Error type for token endpoint calls
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TokenClientError {
    /// HTTP request failed before a response arrived
    #[error("HTTP request failed: {0}")]
    Transport(String),

    /// OAuth server returned an error
    #[error("OAuth error: {0}")]
    OAuth(OAuthError),

    /// Body was not JSON, or not a token response
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TokenClientError {
    /// Whether the IdP rejected the grant itself (revoked or expired token).
    #[must_use]
    pub fn is_invalid_grant(&self) -> bool {
        matches!(self, Self::OAuth(e) if e.error == "invalid_grant")
    }
}

impl From<TokenClientError> for AuthDeskError {
    fn from(err: TokenClientError) -> Self {
        match err {
            TokenClientError::Transport(msg) => Self::TokenExchangeTransport(msg),
            TokenClientError::OAuth(e) => {
                Self::TokenExchangeProtocol { error: e.error, description: e.error_description }
            }
            TokenClientError::Parse(msg) => Self::TokenExchangeProtocol {
                error: "invalid_response".to_string(),
                description: Some(msg),
            },
            TokenClientError::Config(msg) => Self::Config(msg),
        }
    }
}

impl TokenGrant {
    /// Classify a token endpoint response.
    ///
    /// # Errors
    /// - `OAuth` when the body carries an `error` field (any status)
    /// - `OAuth` with `http_<status>` for other non-2xx responses
    /// - `Parse` when a 2xx body is not a token response
    pub fn from_response(status: u16, body: String) -> Result<Self, TokenClientError> {
        let value: Option<serde_json::Value> = serde_json::from_str(&body).ok();

        if let Some(value) = &value {
            if value.get("error").is_some() {
                let error: OAuthError = serde_json::from_value(value.clone())
                    .map_err(|e| TokenClientError::Parse(format!("malformed error body: {e}")))?;
                return Err(TokenClientError::OAuth(error));
            }
        }

        if !(200..300).contains(&status) {
            return Err(TokenClientError::OAuth(OAuthError {
                error: format!("http_{status}"),
                error_description: None,
            }));
        }

        let value = value.ok_or_else(|| TokenClientError::Parse("body is not JSON".to_string()))?;
        let tokens: TokenResponse = serde_json::from_value(value)
            .map_err(|e| TokenClientError::Parse(e.to_string()))?;

        Ok(Self { body, tokens })
    }
}

/// Token endpoint client backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTokenClient {
    token_url: String,
    client_id: String,
    scope: String,
    client: Client,
}

impl HttpTokenClient {
    /// Create a client for the configured identity provider.
    ///
    /// Set `AUTHDESK_DISABLE_PROXY` to bypass system proxies (tests against a
    /// local mock server).
    #[must_use]
    pub fn new(identity: &IdentityConfig) -> Self {
        Self::with_token_url(identity, identity.token_endpoint())
    }

    /// Create a client posting to an explicit token URL.
    #[must_use]
    pub fn with_token_url(identity: &IdentityConfig, token_url: impl Into<String>) -> Self {
        let builder = Client::builder().timeout(std::time::Duration::from_secs(30));
        let builder = if std::env::var_os("AUTHDESK_DISABLE_PROXY").is_some() {
            builder.no_proxy()
        } else {
            builder
        };
        let client = builder.build().unwrap_or_else(|err| {
            warn!(error = %err, "Falling back to default HTTP client");
            Client::new()
        });

        Self {
            token_url: token_url.into(),
            client_id: identity.client_id.clone(),
            scope: identity.scope.clone(),
            client,
        }
    }

    /// Target token URL.
    #[must_use]
    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    async fn post_grant(&self, grant: &GrantRequest) -> Result<TokenGrant, TokenClientError> {
        debug!(grant_type = grant.grant_type(), url = %self.token_url, "Posting token grant");

        let response = self
            .client
            .post(&self.token_url)
            .form(&grant.form(&self.client_id, &self.scope))
            .send()
            .await
            .map_err(|e| TokenClientError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TokenClientError::Transport(e.to_string()))?;

        let result = TokenGrant::from_response(status, body);
        if let Err(err) = &result {
            warn!(grant_type = grant.grant_type(), status, error = %err, "Token grant rejected");
        }
        result
    }
}

#[async_trait]
impl TokenEndpoint for HttpTokenClient {
    async fn exchange(&self, grant: GrantRequest) -> Result<TokenGrant, TokenClientError> {
        if let GrantRequest::RefreshToken { refresh_token } = &grant {
            if refresh_token.is_empty() {
                return Err(TokenClientError::Config("empty refresh token".to_string()));
            }
        }
        self.post_grant(&grant).await
    }
}
