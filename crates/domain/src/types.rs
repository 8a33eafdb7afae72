//! Authentication state and IPC message types

use serde::{Deserialize, Serialize};

use crate::impl_state_conversions;

/// States of the authentication orchestrator.
///
/// Success path: `Idle -> CheckingStoredToken -> AwaitingUserAuth ->
/// ExchangingCode -> Authenticated`. Silent path: `CheckingStoredToken ->
/// RefreshingToken -> Authenticated | Failed`. `Failed` always settles back
/// into `Idle` once the attempt is torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    Idle,
    CheckingStoredToken,
    AwaitingUserAuth,
    ExchangingCode,
    RefreshingToken,
    Authenticated,
    Failed,
    /// Logout navigation in progress.
    SigningOut,
}

impl_state_conversions!(AuthState {
    Idle => "idle",
    CheckingStoredToken => "checking_stored_token",
    AwaitingUserAuth => "awaiting_user_auth",
    ExchangingCode => "exchanging_code",
    RefreshingToken => "refreshing_token",
    Authenticated => "authenticated",
    Failed => "failed",
    SigningOut => "signing_out",
});

impl AuthState {
    /// Whether a token grant or logout is currently in flight.
    ///
    /// A new interactive attempt must not start while this holds, since it
    /// would race the pending exchange.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::ExchangingCode | Self::RefreshingToken | Self::SigningOut)
    }
}

/// Messages sent from the UI process to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "camelCase")]
pub enum UiCommand {
    Login,
    Logout,
    RefreshAccessToken(String),
}

/// Messages sent from the orchestrator to the UI process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "camelCase")]
pub enum HostMessage {
    /// Raw token-response body on success, `None` when the attempt failed.
    TokenReceived(Option<String>),
}

impl HostMessage {
    /// Whether this message reports a usable token.
    #[must_use]
    pub fn is_logged_in(&self) -> bool {
        match self {
            Self::TokenReceived(body) => body.as_deref().is_some_and(|b| !b.trim().is_empty()),
        }
    }
}
