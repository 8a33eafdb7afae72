//! System browser authentication surface
//!
//! The user's default browser cannot be hidden, observed or closed from
//! here. Navigations are handed to the OS; the redirect is observed by the
//! loopback catcher and relayed back as a `RequestCompleted` event for the
//! session that owns the surface. A page handed to the browser is reported
//! as loaded straight away.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use authdesk_core::{AuthenticationSurface, SessionId, SurfaceEventSink, SurfaceFactory};
use authdesk_domain::{AuthDeskError, Result};
use tracing::{debug, info};
use url::Url;

use crate::http::RequestObserver;

/// Opens a URL outside the process.
pub type Opener = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

/// Routes catcher-observed URLs to the live surface's event sink.
#[derive(Default)]
pub struct RedirectRelay {
    sink: Mutex<Option<SurfaceEventSink>>,
}

impl RedirectRelay {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn attach(&self, sink: SurfaceEventSink) {
        *self.sink.lock().unwrap_or_else(PoisonError::into_inner) = Some(sink);
    }

    fn detach(&self, session: SessionId) {
        let mut guard = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.as_ref().is_some_and(|sink| sink.session() == session) {
            *guard = None;
        }
    }
}

impl RequestObserver for RedirectRelay {
    fn observe(&self, url: Url) {
        let guard = self.sink.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_ref() {
            Some(sink) => {
                sink.request_completed(url);
            }
            None => debug!("No surface attached, dropping observed request"),
        }
    }
}

/// [`AuthenticationSurface`] backed by the default browser.
pub struct SystemBrowserSurface {
    events: SurfaceEventSink,
    relay: Arc<RedirectRelay>,
    opener: Opener,
    shown: AtomicBool,
}

#[async_trait]
impl AuthenticationSurface for SystemBrowserSurface {
    async fn show(&self) -> Result<()> {
        self.shown.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn navigate(&self, url: &Url) -> Result<()> {
        if !self.shown.load(Ordering::SeqCst) {
            return Err(AuthDeskError::Surface("browser surface is not shown".to_string()));
        }

        let opener = Arc::clone(&self.opener);
        let target = url.to_string();
        tokio::task::spawn_blocking(move || opener(&target))
            .await
            .map_err(|e| AuthDeskError::Internal(format!("browser launch task failed: {e}")))?
            .map_err(|e| AuthDeskError::Surface(format!("failed to open browser: {e}")))?;

        info!(host = url.host_str().unwrap_or_default(), "Opened page in system browser");
        self.events.load_finished(url.clone());
        Ok(())
    }

    async fn close(&self) {
        self.relay.detach(self.events.session());
    }
}

/// Creates [`SystemBrowserSurface`]s sharing one [`RedirectRelay`].
pub struct BrowserSurfaceFactory {
    relay: Arc<RedirectRelay>,
    opener: Opener,
}

impl BrowserSurfaceFactory {
    /// Factory that opens pages with the `webbrowser` crate.
    #[must_use]
    pub fn new(relay: Arc<RedirectRelay>) -> Self {
        Self::with_opener(relay, Arc::new(|url: &str| webbrowser::open(url)))
    }

    #[must_use]
    pub fn with_opener(relay: Arc<RedirectRelay>, opener: Opener) -> Self {
        Self { relay, opener }
    }
}

#[async_trait]
impl SurfaceFactory for BrowserSurfaceFactory {
    async fn create(&self, events: SurfaceEventSink) -> Result<Box<dyn AuthenticationSurface>> {
        self.relay.attach(events.clone());
        Ok(Box::new(SystemBrowserSurface {
            events,
            relay: Arc::clone(&self.relay),
            opener: Arc::clone(&self.opener),
            shown: AtomicBool::new(false),
        }))
    }
}
