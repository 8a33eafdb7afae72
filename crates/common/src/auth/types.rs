//! OAuth 2.0 wire types
//!
//! Request builders and response shapes for the identity provider's
//! `authorize` and `token` endpoints, plus the persisted refresh-token record.

use std::fmt;

use authdesk_domain::constants::REFRESH_TOKEN_RECORD_NAME;
use authdesk_domain::{AuthDeskError, IdentityConfig};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use super::pkce::PkcePair;

/// Token endpoint success body (RFC 6749 §5.1).
///
/// Unknown fields (`ext_expires_in`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// A successful grant: the raw body as the IdP sent it plus its parsed form.
///
/// The raw body is what crosses the IPC boundary; the parsed form is only
/// used to pick out the refresh token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub body: String,
    pub tokens: TokenResponse,
}

/// OAuth error response from the authorization server (RFC 6749 §5.2).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OAuthError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl fmt::Display for OAuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_description {
            Some(desc) => write!(f, "{}: {}", self.error, desc),
            None => write!(f, "{}", self.error),
        }
    }
}

impl std::error::Error for OAuthError {}

/// Form body for one call to the token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrantRequest {
    AuthorizationCode { code: String, redirect_uri: String, code_verifier: String },
    /// The refresh grant carries no PKCE verifier.
    RefreshToken { refresh_token: String },
}

impl GrantRequest {
    /// `grant_type` value on the wire.
    #[must_use]
    pub fn grant_type(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
        }
    }

    /// Build the `application/x-www-form-urlencoded` pairs.
    #[must_use]
    pub fn form(&self, client_id: &str, scope: &str) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("grant_type", self.grant_type().to_string()),
            ("client_id", client_id.to_string()),
        ];
        match self {
            Self::AuthorizationCode { code, redirect_uri, code_verifier } => {
                pairs.push(("code", code.clone()));
                pairs.push(("redirect_uri", redirect_uri.clone()));
                pairs.push(("scope", scope.to_string()));
                pairs.push(("code_verifier", code_verifier.clone()));
            }
            Self::RefreshToken { refresh_token } => {
                pairs.push(("refresh_token", refresh_token.clone()));
                pairs.push(("scope", scope.to_string()));
            }
        }
        pairs
    }
}

/// Builder for the `authorize` navigation URL.
pub struct AuthorizeRequest<'a> {
    pub identity: &'a IdentityConfig,
    pub redirect_uri: &'a str,
    pub state: &'a str,
    pub pkce: &'a PkcePair,
}

impl AuthorizeRequest<'_> {
    /// `{authorize}?client_id&response_type=code&redirect_uri&response_mode=query&scope&state&code_challenge_method=S256&code_challenge`
    ///
    /// # Errors
    /// Returns `AuthDeskError::Config` if the authorize endpoint is not a URL.
    pub fn to_url(&self) -> Result<Url, AuthDeskError> {
        let mut url = Url::parse(&self.identity.authorize_endpoint())
            .map_err(|e| AuthDeskError::Config(format!("Invalid authorize endpoint: {e}")))?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.identity.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", self.redirect_uri)
            .append_pair("response_mode", "query")
            .append_pair("scope", &self.identity.scope)
            .append_pair("state", self.state)
            .append_pair("code_challenge_method", self.pkce.challenge_method())
            .append_pair("code_challenge", &self.pkce.challenge);

        Ok(url)
    }
}

/// Persisted refresh token.
///
/// Mirrors a cookie: named `refresh_token`, JSON-serialised value, http-only,
/// absolute expiry in epoch seconds assigned by the application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    pub name: String,
    /// JSON-encoded token string.
    pub value: String,
    pub http_only: bool,
    /// Epoch seconds.
    pub expires_at: i64,
}

impl RefreshTokenRecord {
    /// Wrap `token` with an expiry of `now + ttl_days`.
    #[must_use]
    pub fn new(token: &str, ttl_days: i64, now: DateTime<Utc>) -> Self {
        let value = serde_json::Value::String(token.to_string()).to_string();
        Self {
            name: REFRESH_TOKEN_RECORD_NAME.to_string(),
            value,
            http_only: true,
            expires_at: (now + Duration::days(ttl_days)).timestamp(),
        }
    }

    /// Decode the stored token.
    ///
    /// # Errors
    /// Returns the JSON error if `value` is not a JSON string.
    pub fn token(&self) -> Result<String, serde_json::Error> {
        serde_json::from_str(&self.value)
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.expires_at
    }
}
