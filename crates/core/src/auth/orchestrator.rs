//! Authentication orchestrator
//!
//! Owns the [`AuthState`] machine and the single live [`AuthSession`]. All
//! inputs (UI commands, surface events and token grant results) are queued
//! and consumed by one task, so handlers never run concurrently.
//!
//! ```text
//! Idle ─► CheckingStoredToken ─┬─► RefreshingToken ─┬─► Authenticated
//!                              │                    └─► Failed ─► Idle
//!                              └─► AwaitingUserAuth ─► ExchangingCode ─┬─► Authenticated
//!                                                                      └─► Failed ─► Idle
//! any ─(Logout)─► SigningOut ─► Idle
//! ```

use std::sync::Arc;

use authdesk_common::{
    GrantRequest, RefreshTokenRecord, TokenClientError, TokenEndpoint, TokenGrant, TokenStore,
};
use authdesk_domain::{AuthDeskError, AuthState, Config, HostMessage, Result, UiCommand};
use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};
use url::Url;

use super::session::{AuthSession, RedirectOutcome, SessionPurpose};
use crate::ports::{
    IpcChannel, RedirectCatcher, SessionId, SurfaceEvent, SurfaceEventKind, SurfaceEventSink,
    SurfaceFactory,
};

/// Everything the orchestrator drives.
pub struct AuthPorts {
    pub surfaces: Arc<dyn SurfaceFactory>,
    pub catcher: Arc<dyn RedirectCatcher>,
    pub endpoint: Arc<dyn TokenEndpoint>,
    pub store: Arc<dyn TokenStore>,
    pub ipc: Arc<dyn IpcChannel>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum GrantKind {
    AuthorizationCode,
    Refresh { presented: String },
}

#[derive(Debug)]
struct PendingGrant {
    attempt: SessionId,
    kind: GrantKind,
}

#[derive(Debug)]
struct GrantOutcome {
    attempt: SessionId,
    result: std::result::Result<TokenGrant, TokenClientError>,
}

/// What the orchestrator does before it starts taking commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupMode {
    /// Check the stored refresh token, then sign in silently or
    /// interactively.
    #[default]
    SignIn,
    /// Stay `Idle` until a command arrives.
    Passive,
}

struct Inbox {
    surface_rx: mpsc::UnboundedReceiver<SurfaceEvent>,
    grant_rx: mpsc::UnboundedReceiver<GrantOutcome>,
}

/// Authentication state machine
pub struct AuthOrchestrator {
    config: Config,
    redirect_uri: String,
    redirect_url: Url,
    ports: AuthPorts,
    state_tx: watch::Sender<AuthState>,
    signouts_tx: watch::Sender<u64>,
    session: Option<AuthSession>,
    pending: Option<PendingGrant>,
    last_attempt: SessionId,
    surface_tx: mpsc::UnboundedSender<SurfaceEvent>,
    grant_tx: mpsc::UnboundedSender<GrantOutcome>,
    inbox: Option<Inbox>,
}

impl AuthOrchestrator {
    /// Create an orchestrator in the `Idle` state.
    ///
    /// # Errors
    /// Returns `AuthDeskError::Config` if the configuration is incomplete or
    /// does not yield a valid redirect URI.
    pub fn new(config: Config, ports: AuthPorts) -> Result<Self> {
        config.validate()?;
        let redirect_url = config.catcher.redirect_url()?;
        let redirect_uri = config.catcher.redirect_uri();
        let (state_tx, _) = watch::channel(AuthState::Idle);
        let (signouts_tx, _) = watch::channel(0);
        let (surface_tx, surface_rx) = mpsc::unbounded_channel();
        let (grant_tx, grant_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            redirect_uri,
            redirect_url,
            ports,
            state_tx,
            signouts_tx,
            session: None,
            pending: None,
            last_attempt: 0,
            surface_tx,
            grant_tx,
            inbox: Some(Inbox { surface_rx, grant_rx }),
        })
    }

    /// Watch state transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    /// Count of finished `Logout` commands, successful or not.
    #[must_use]
    pub fn subscribe_signouts(&self) -> watch::Receiver<u64> {
        self.signouts_tx.subscribe()
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        *self.state_tx.borrow()
    }

    /// Check the stored token, then process inputs until `commands` closes.
    pub async fn run(self, commands: mpsc::UnboundedReceiver<UiCommand>) {
        self.run_with(StartupMode::SignIn, commands).await;
    }

    /// Like [`run`](Self::run), with an explicit startup behaviour.
    pub async fn run_with(
        mut self,
        startup: StartupMode,
        mut commands: mpsc::UnboundedReceiver<UiCommand>,
    ) {
        let Some(Inbox { mut surface_rx, mut grant_rx }) = self.inbox.take() else {
            return;
        };

        info!(redirect_uri = %self.redirect_uri, ?startup, "Auth orchestrator started");
        if startup == StartupMode::SignIn {
            self.check_stored_token().await;
        }

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
                Some(event) = surface_rx.recv() => self.handle_surface_event(event).await,
                Some(outcome) = grant_rx.recv() => self.handle_grant_outcome(outcome).await,
            }
        }

        self.shutdown().await;
    }

    // ------------------------------------------------------------------
    // Startup
    // ------------------------------------------------------------------

    async fn check_stored_token(&mut self) {
        self.transition(AuthState::CheckingStoredToken);

        if let Err(err) = self.open_session(SessionPurpose::Interactive).await {
            self.fail_attempt(err).await;
            return;
        }

        match self.stored_refresh_token().await {
            Some(token) => {
                // The hidden surface is never shown on the silent path.
                self.discard_session().await;
                self.start_refresh(token);
            }
            None => self.start_interactive().await,
        }
    }

    async fn stored_refresh_token(&self) -> Option<String> {
        let record = match self.ports.store.load().await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!("No stored refresh token");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "Failed to read stored refresh token, treating as absent");
                return None;
            }
        };

        if record.is_expired(Utc::now()) {
            info!(expires_at = record.expires_at, "Stored refresh token expired");
            self.erase_stored_token().await;
            return None;
        }

        match record.token() {
            Ok(token) if !token.is_empty() => Some(token),
            other => {
                warn!(corrupt = other.is_err(), "Discarding unusable stored refresh token");
                self.erase_stored_token().await;
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    async fn handle_command(&mut self, command: UiCommand) {
        match command {
            UiCommand::Login => self.login().await,
            UiCommand::Logout => self.logout().await,
            UiCommand::RefreshAccessToken(token) => self.refresh_on_request(token),
        }
    }

    async fn login(&mut self) {
        let state = self.state();
        if state.is_busy() {
            let err = AuthDeskError::AttemptInProgress(state.to_string());
            warn!(error = %err, "Rejecting login request");
            return;
        }

        if state == AuthState::AwaitingUserAuth && self.session.is_some() {
            info!("Login requested while awaiting the user, presenting the sign-in page again");
            if let Err(err) = self.present_authorize_page().await {
                self.fail_attempt(err).await;
            }
            return;
        }

        if let Err(err) = self.open_session(SessionPurpose::Interactive).await {
            self.fail_attempt(err).await;
            return;
        }
        self.start_interactive().await;
    }

    async fn logout(&mut self) {
        info!(state = %self.state(), "Signing out");
        self.pending = None;
        self.discard_session().await;
        self.erase_stored_token().await;

        match self.present_logout_page().await {
            Ok(()) => self.transition(AuthState::SigningOut),
            Err(err) => {
                error!(error = %err, "Failed to present logout page");
                self.discard_session().await;
                self.transition(AuthState::Idle);
                self.signouts_tx.send_modify(|count| *count += 1);
            }
        }
    }

    fn refresh_on_request(&mut self, refresh_token: String) {
        let state = self.state();
        if state.is_busy() || self.session.is_some() {
            let err = AuthDeskError::AttemptInProgress(state.to_string());
            warn!(error = %err, "Rejecting refresh request");
            return;
        }
        self.start_refresh(refresh_token);
    }

    // ------------------------------------------------------------------
    // Surface events
    // ------------------------------------------------------------------

    async fn handle_surface_event(&mut self, event: SurfaceEvent) {
        let Some(purpose) = self
            .session
            .as_ref()
            .filter(|session| session.id() == event.session)
            .map(AuthSession::purpose)
        else {
            debug!(session = event.session, "Dropping event from disposed session");
            return;
        };

        match (purpose, event.kind) {
            (
                SessionPurpose::Interactive,
                SurfaceEventKind::RequestCompleted(url) | SurfaceEventKind::LoadFinished(url),
            ) => {
                if self.state() == AuthState::AwaitingUserAuth {
                    self.on_navigation(&url).await;
                }
            }
            (SessionPurpose::Logout, SurfaceEventKind::LoadFinished(url)) => {
                if self.state() == AuthState::SigningOut {
                    debug!(%url, "Logout page loaded");
                    self.finish_logout().await;
                }
            }
            (SessionPurpose::Logout, SurfaceEventKind::RequestCompleted(_)) => {}
            (_, SurfaceEventKind::Closed) => self.on_surface_closed().await,
        }
    }

    async fn on_navigation(&mut self, url: &Url) {
        let Some(session) = self.session.as_ref() else {
            return;
        };

        match session.inspect_redirect(url, &self.redirect_url) {
            RedirectOutcome::NotRedirect => {}
            RedirectOutcome::StateMismatch => {
                let err = AuthDeskError::StateMismatch;
                warn!(session = session.id(), error = %err, "Ignoring redirect");
            }
            RedirectOutcome::Denied { error, description } => {
                let reason = match description {
                    Some(description) => format!("{error}: {description}"),
                    None => error,
                };
                self.fail_attempt(AuthDeskError::Authorization(reason)).await;
            }
            RedirectOutcome::Code(code) => {
                let attempt = session.id();
                let grant = GrantRequest::AuthorizationCode {
                    code,
                    redirect_uri: self.redirect_uri.clone(),
                    code_verifier: session.pkce().verifier.clone(),
                };
                self.transition(AuthState::ExchangingCode);
                self.dispatch_grant(attempt, GrantKind::AuthorizationCode, grant);
            }
        }
    }

    async fn on_surface_closed(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.detach_surface();
        }

        match self.state() {
            AuthState::AwaitingUserAuth => self.fail_attempt(AuthDeskError::Cancelled).await,
            AuthState::SigningOut => self.finish_logout().await,
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Token grants
    // ------------------------------------------------------------------

    fn start_refresh(&mut self, refresh_token: String) {
        self.transition(AuthState::RefreshingToken);
        self.last_attempt += 1;
        let attempt = self.last_attempt;
        let kind = GrantKind::Refresh { presented: refresh_token.clone() };
        self.dispatch_grant(attempt, kind, GrantRequest::RefreshToken { refresh_token });
    }

    fn dispatch_grant(&mut self, attempt: SessionId, kind: GrantKind, grant: GrantRequest) {
        debug!(attempt, grant_type = grant.grant_type(), "Dispatching token grant");
        self.pending = Some(PendingGrant { attempt, kind });

        let endpoint = Arc::clone(&self.ports.endpoint);
        let tx = self.grant_tx.clone();
        tokio::spawn(async move {
            let result = endpoint.exchange(grant).await;
            // Receiver is gone once the orchestrator has shut down.
            let _ = tx.send(GrantOutcome { attempt, result });
        });
    }

    async fn handle_grant_outcome(&mut self, outcome: GrantOutcome) {
        if !matches!(&self.pending, Some(pending) if pending.attempt == outcome.attempt) {
            debug!(attempt = outcome.attempt, "Dropping result of abandoned token grant");
            return;
        }
        let Some(pending) = self.pending.take() else {
            return;
        };

        match outcome.result {
            Ok(grant) => self.complete(pending.kind, grant).await,
            Err(err) => {
                if matches!(pending.kind, GrantKind::Refresh { .. }) && err.is_invalid_grant() {
                    info!("Identity provider rejected the refresh token, clearing it");
                    self.erase_stored_token().await;
                }
                self.fail_attempt(err.into()).await;
            }
        }
    }

    async fn complete(&mut self, kind: GrantKind, grant: TokenGrant) {
        if let Some(issued) = grant.tokens.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            let rotated = match &kind {
                GrantKind::AuthorizationCode => true,
                GrantKind::Refresh { presented } => presented != issued,
            };
            if rotated {
                self.persist_refresh_token(issued).await;
            }
        }

        if let Err(err) = self.ports.ipc.send(HostMessage::TokenReceived(Some(grant.body))) {
            warn!(error = %err, "Failed to deliver token to the UI");
        }
        self.transition(AuthState::Authenticated);
        self.discard_session().await;
    }

    async fn persist_refresh_token(&self, token: &str) {
        let ttl_days = self.config.storage.refresh_token_ttl_days;
        let record = RefreshTokenRecord::new(token, ttl_days, Utc::now());
        match self.ports.store.save(&record).await {
            Ok(()) => debug!(expires_at = record.expires_at, "Refresh token persisted"),
            Err(err) => warn!(error = %err, "Failed to persist refresh token"),
        }
    }

    async fn erase_stored_token(&self) {
        if let Err(err) = self.ports.store.clear().await {
            warn!(error = %err, "Failed to clear stored refresh token");
        }
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Replace the live session with a new one bound to the catcher and a
    /// hidden surface. The new session is installed even on failure so the
    /// caller's teardown releases whatever was acquired.
    async fn open_session(&mut self, purpose: SessionPurpose) -> Result<()> {
        self.discard_session().await;
        self.last_attempt += 1;

        let mut session = AuthSession::new(self.last_attempt, purpose);
        let result = self.bind(&mut session).await;
        debug!(session = session.id(), ?purpose, ok = result.is_ok(), "Opened authentication session");
        self.session = Some(session);
        result
    }

    async fn bind(&self, session: &mut AuthSession) -> Result<()> {
        self.ports.catcher.start().await?;
        session.mark_catcher_bound();

        let sink = SurfaceEventSink::new(session.id(), self.surface_tx.clone());
        let surface = self.ports.surfaces.create(sink).await?;
        session.attach_surface(surface);
        Ok(())
    }

    async fn discard_session(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.teardown(self.ports.catcher.as_ref()).await;
        }
    }

    async fn start_interactive(&mut self) {
        match self.present_authorize_page().await {
            Ok(()) => self.transition(AuthState::AwaitingUserAuth),
            Err(err) => self.fail_attempt(err).await,
        }
    }

    async fn present_authorize_page(&self) -> Result<()> {
        let session = self
            .session
            .as_ref()
            .ok_or_else(|| AuthDeskError::Internal("no active session".to_string()))?;
        let url = session.authorize_url(&self.config.identity, &self.redirect_uri)?;
        let surface = session
            .surface()
            .ok_or_else(|| AuthDeskError::Surface("authentication surface is gone".to_string()))?;

        surface.show().await?;
        surface.navigate(&url).await
    }

    async fn present_logout_page(&mut self) -> Result<()> {
        self.open_session(SessionPurpose::Logout).await?;

        let url = Url::parse(&self.config.identity.logout_endpoint())
            .map_err(|e| AuthDeskError::Config(format!("Invalid logout endpoint: {e}")))?;
        let surface = self
            .session
            .as_ref()
            .and_then(|session| session.surface())
            .ok_or_else(|| AuthDeskError::Surface("authentication surface is gone".to_string()))?;

        surface.show().await?;
        surface.navigate(&url).await
    }

    async fn finish_logout(&mut self) {
        self.discard_session().await;
        info!("Signed out");
        self.transition(AuthState::Idle);
        self.signouts_tx.send_modify(|count| *count += 1);
    }

    async fn fail_attempt(&mut self, err: AuthDeskError) {
        match &err {
            AuthDeskError::Cancelled => info!("Authentication cancelled by the user"),
            _ => error!(error = %err, kind = err.label(), "Authentication attempt failed"),
        }

        self.transition(AuthState::Failed);
        self.pending = None;
        self.discard_session().await;
        if let Err(send_err) = self.ports.ipc.send(HostMessage::TokenReceived(None)) {
            warn!(error = %send_err, "Failed to report authentication failure to the UI");
        }
        self.transition(AuthState::Idle);
    }

    async fn shutdown(&mut self) {
        info!("Command channel closed, stopping auth orchestrator");
        self.pending = None;
        self.discard_session().await;
        self.ports.catcher.stop().await;
    }

    fn transition(&self, to: AuthState) {
        let from = self.state();
        if from == to {
            return;
        }
        info!(%from, %to, "Auth state transition");
        self.state_tx.send_replace(to);
    }
}
