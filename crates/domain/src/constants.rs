//! Application constants
//!
//! Centralized location for domain-level constants.

// Identity provider defaults
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
pub const DEFAULT_LOGOUT_TENANT: &str = "common";
pub const OAUTH_PATH_PREFIX: &str = "oauth2/v2.0";

// Redirect catcher defaults
pub const DEFAULT_CATCHER_PROTOCOL: &str = "http";
pub const DEFAULT_CATCHER_HOST: &str = "localhost";
pub const DEFAULT_CATCHER_PORT: u16 = 4200;
pub const CATCHER_PLACEHOLDER_BODY: &str = "Logging In!";

// Token storage
pub const DEFAULT_STORAGE_SERVICE: &str = "authdesk";
pub const REFRESH_TOKEN_RECORD_NAME: &str = "refresh_token";
pub const DEFAULT_REFRESH_TOKEN_TTL_DAYS: i64 = 90;

// PKCE
pub const PKCE_CHALLENGE_METHOD: &str = "S256";
