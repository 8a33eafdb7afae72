//! Port interfaces for authentication orchestration
//!
//! These traits define the boundaries between the orchestrator and the
//! platform pieces it drives: the authentication surface, the loopback
//! redirect catcher, the IPC channel towards the UI and UI navigation.

use async_trait::async_trait;
use authdesk_domain::{HostMessage, Result};
use tokio::sync::mpsc;
use url::Url;

/// Identifies one authentication attempt.
///
/// Events are tagged with the id of the attempt that produced them so the
/// orchestrator can drop anything left over from a disposed attempt.
pub type SessionId = u64;

/// What happened on an authentication surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceEventKind {
    /// A network request issued by the surface completed.
    RequestCompleted(Url),
    /// The surface finished loading a page.
    LoadFinished(Url),
    /// The surface went away.
    Closed,
}

/// Event emitted by a surface, tagged with its attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceEvent {
    pub session: SessionId,
    pub kind: SurfaceEventKind,
}

/// Handle a surface uses to report events back to the orchestrator.
///
/// Sending never blocks. Once the orchestrator is gone every send is a
/// silent no-op, reported through the return value.
#[derive(Debug, Clone)]
pub struct SurfaceEventSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<SurfaceEvent>,
}

impl SurfaceEventSink {
    pub(crate) fn new(session: SessionId, tx: mpsc::UnboundedSender<SurfaceEvent>) -> Self {
        Self { session, tx }
    }

    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn request_completed(&self, url: Url) -> bool {
        self.emit(SurfaceEventKind::RequestCompleted(url))
    }

    pub fn load_finished(&self, url: Url) -> bool {
        self.emit(SurfaceEventKind::LoadFinished(url))
    }

    pub fn closed(&self) -> bool {
        self.emit(SurfaceEventKind::Closed)
    }

    fn emit(&self, kind: SurfaceEventKind) -> bool {
        self.tx.send(SurfaceEvent { session: self.session, kind }).is_ok()
    }
}

/// A window (or browser) that displays identity provider pages.
#[async_trait]
pub trait AuthenticationSurface: Send + Sync {
    /// Make the surface visible.
    async fn show(&self) -> Result<()>;

    /// Load `url` in the surface.
    async fn navigate(&self, url: &Url) -> Result<()>;

    /// Close the surface. Must be safe to call more than once.
    async fn close(&self);
}

/// Creates a hidden surface for one attempt.
#[async_trait]
pub trait SurfaceFactory: Send + Sync {
    /// # Errors
    /// Returns `AuthDeskError::Surface` if the surface cannot be created.
    async fn create(&self, events: SurfaceEventSink) -> Result<Box<dyn AuthenticationSurface>>;
}

/// Loopback HTTP listener bound to the redirect URI.
#[async_trait]
pub trait RedirectCatcher: Send + Sync {
    /// Bind the listener. Calling this while already running is a no-op.
    ///
    /// # Errors
    /// Returns `AuthDeskError::PortBind` when the address is unavailable.
    async fn start(&self) -> Result<()>;

    /// Release the port. Idempotent.
    async fn stop(&self);

    fn is_running(&self) -> bool;
}

/// Orchestrator-to-UI direction of the IPC channel.
pub trait IpcChannel: Send + Sync {
    /// # Errors
    /// Returns `AuthDeskError::Ipc` when the UI side is gone.
    fn send(&self, message: HostMessage) -> Result<()>;
}

/// Views the UI can switch to after a login attempt resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Unauthorized,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Unauthorized => "/unauthorized",
        }
    }
}

/// Switches the UI view.
#[async_trait]
pub trait Navigator: Send + Sync {
    /// # Errors
    /// Returns an error if the UI cannot switch views.
    async fn navigate(&self, route: Route) -> Result<()>;
}
