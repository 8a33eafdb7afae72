//! Per-attempt authentication session
//!
//! A session owns everything that must not outlive one attempt: the PKCE
//! verifier, the state token, the surface and the catcher binding. Sessions
//! are created at the start of an attempt and never reused.

use authdesk_common::auth::pkce::{generate_state, validate_state};
use authdesk_common::{AuthorizeRequest, PkcePair};
use authdesk_domain::{IdentityConfig, Result};
use tracing::debug;
use url::Url;

use crate::ports::{AuthenticationSurface, RedirectCatcher, SessionId};

/// Why the session exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPurpose {
    /// Authorization code flow with PKCE.
    Interactive,
    /// Navigating the surface to the logout endpoint.
    Logout,
}

/// Result of inspecting a URL seen by the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// Not a redirect to our URI, or one without a code or error.
    NotRedirect,
    /// Redirect whose `state` does not match this session.
    StateMismatch,
    /// The identity provider returned an error instead of a code.
    Denied { error: String, description: Option<String> },
    /// Authorization code for this session.
    Code(String),
}

pub struct AuthSession {
    id: SessionId,
    purpose: SessionPurpose,
    pkce: PkcePair,
    state_token: String,
    surface: Option<Box<dyn AuthenticationSurface>>,
    catcher_bound: bool,
}

impl AuthSession {
    /// New session with a fresh verifier, challenge and state token.
    #[must_use]
    pub fn new(id: SessionId, purpose: SessionPurpose) -> Self {
        Self {
            id,
            purpose,
            pkce: PkcePair::generate(),
            state_token: generate_state(),
            surface: None,
            catcher_bound: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn purpose(&self) -> SessionPurpose {
        self.purpose
    }

    #[must_use]
    pub fn pkce(&self) -> &PkcePair {
        &self.pkce
    }

    #[must_use]
    pub fn state_token(&self) -> &str {
        &self.state_token
    }

    pub fn attach_surface(&mut self, surface: Box<dyn AuthenticationSurface>) {
        self.surface = Some(surface);
    }

    #[must_use]
    pub fn surface(&self) -> Option<&dyn AuthenticationSurface> {
        self.surface.as_deref()
    }

    /// Forget the surface without closing it (it is already gone).
    pub fn detach_surface(&mut self) {
        self.surface = None;
    }

    pub fn mark_catcher_bound(&mut self) {
        self.catcher_bound = true;
    }

    #[must_use]
    pub fn catcher_bound(&self) -> bool {
        self.catcher_bound
    }

    /// Authorize URL carrying this session's challenge and state token.
    ///
    /// # Errors
    /// Returns `AuthDeskError::Config` if the authorize endpoint is invalid.
    pub fn authorize_url(&self, identity: &IdentityConfig, redirect_uri: &str) -> Result<Url> {
        AuthorizeRequest { identity, redirect_uri, state: &self.state_token, pkce: &self.pkce }
            .to_url()
    }

    /// Decide whether `url` is the identity provider redirecting back to us.
    ///
    /// A redirect matches when scheme, host, port and path equal those of
    /// `redirect`. The `state` parameter is compared in constant time.
    #[must_use]
    pub fn inspect_redirect(&self, url: &Url, redirect: &Url) -> RedirectOutcome {
        if !targets(url, redirect) {
            return RedirectOutcome::NotRedirect;
        }

        let mut code = None;
        let mut state = None;
        let mut error = None;
        let mut description = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => error = Some(value.into_owned()),
                "error_description" => description = Some(value.into_owned()),
                _ => {}
            }
        }

        if code.is_none() && error.is_none() {
            return RedirectOutcome::NotRedirect;
        }

        let state_ok = state.as_deref().is_some_and(|s| validate_state(&self.state_token, s));
        if !state_ok {
            return RedirectOutcome::StateMismatch;
        }

        match (code, error) {
            (Some(code), _) if !code.is_empty() => RedirectOutcome::Code(code),
            (_, Some(error)) => RedirectOutcome::Denied { error, description },
            _ => RedirectOutcome::NotRedirect,
        }
    }

    /// Close the surface and release the catcher port.
    pub async fn teardown(&mut self, catcher: &dyn RedirectCatcher) {
        if let Some(surface) = self.surface.take() {
            surface.close().await;
        }
        if self.catcher_bound {
            catcher.stop().await;
            self.catcher_bound = false;
        }
        debug!(session = self.id, "Authentication session torn down");
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("id", &self.id)
            .field("purpose", &self.purpose)
            .field("pkce", &self.pkce)
            .field("has_surface", &self.surface.is_some())
            .field("catcher_bound", &self.catcher_bound)
            .finish_non_exhaustive()
    }
}

fn targets(url: &Url, redirect: &Url) -> bool {
    url.scheme() == redirect.scheme()
        && url.host_str() == redirect.host_str()
        && url.port_or_known_default() == redirect.port_or_known_default()
        && url.path() == redirect.path()
}
