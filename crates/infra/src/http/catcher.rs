//! Loopback redirect catcher
//!
//! Binds the redirect URI's host and port so the identity provider's
//! redirect lands somewhere. Every request, whatever its path or method,
//! gets a 200 with a short placeholder body; the query string is never
//! interpreted here. The orchestrator learns about the redirect through the
//! authentication surface, or through a [`RequestObserver`] when the surface
//! cannot see its own navigations.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use authdesk_core::RedirectCatcher;
use authdesk_domain::{AuthDeskError, CatcherConfig, Result};
use axum::extract::State;
use axum::http::Uri;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

/// Receives the full URL of every request the catcher answers.
pub trait RequestObserver: Send + Sync {
    fn observe(&self, url: Url);
}

struct CatchContext {
    base: String,
    body: String,
    observer: Option<Arc<dyn RequestObserver>>,
}

struct RunningServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

/// axum-backed [`RedirectCatcher`].
pub struct LoopbackCatcher {
    config: CatcherConfig,
    observer: Option<Arc<dyn RequestObserver>>,
    server: Mutex<Option<RunningServer>>,
    running: AtomicBool,
}

impl LoopbackCatcher {
    #[must_use]
    pub fn new(config: CatcherConfig) -> Self {
        Self { config, observer: None, server: Mutex::new(None), running: AtomicBool::new(false) }
    }

    /// Forward every answered request URL to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Address actually bound, while running.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock_server().as_ref().map(|server| server.addr)
    }

    fn lock_server(&self) -> std::sync::MutexGuard<'_, Option<RunningServer>> {
        self.server.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_server(&self) -> Option<RunningServer> {
        let server = self.lock_server().take();
        self.running.store(false, Ordering::SeqCst);
        server
    }
}

/// Router answering every path and method with `body`.
fn router(context: Arc<CatchContext>) -> Router {
    Router::new().fallback(catch_all).with_state(context)
}

async fn catch_all(State(context): State<Arc<CatchContext>>, uri: Uri) -> String {
    debug!(path = uri.path(), "Redirect catcher answered request");

    if let Some(observer) = &context.observer {
        let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
        match Url::parse(&format!("{}{}", context.base, path_and_query)) {
            Ok(url) => observer.observe(url),
            Err(err) => warn!(error = %err, "Could not rebuild request URL"),
        }
    }

    context.body.clone()
}

#[async_trait]
impl RedirectCatcher for LoopbackCatcher {
    async fn start(&self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let bind_to = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_to).await.map_err(|err| {
            AuthDeskError::PortBind(format!("failed to bind redirect catcher on {bind_to}: {err}"))
        })?;
        let addr = listener.local_addr().map_err(|err| {
            AuthDeskError::PortBind(format!("failed to determine catcher address: {err}"))
        })?;

        let context = Arc::new(CatchContext {
            base: format!("{}://{}:{}", self.config.protocol, self.config.host, addr.port()),
            body: self.config.placeholder_body.clone(),
            observer: self.observer.clone(),
        });
        let app = router(context);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
            {
                error!(error = %err, "Redirect catcher server error");
            }
        });

        *self.lock_server() =
            Some(RunningServer { addr, shutdown_tx: Some(shutdown_tx), handle: Some(handle) });
        self.running.store(true, Ordering::SeqCst);
        info!(%addr, "Redirect catcher listening");
        Ok(())
    }

    async fn stop(&self) {
        let Some(mut server) = self.take_server() else {
            return;
        };

        if let Some(tx) = server.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = server.handle.take() {
            if let Err(err) = handle.await {
                if err.is_panic() {
                    error!(error = %err, "Redirect catcher task panicked");
                }
            }
        }
        info!(addr = %server.addr, "Redirect catcher stopped");
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl Drop for LoopbackCatcher {
    fn drop(&mut self) {
        if let Some(mut server) = self.take_server() {
            if let Some(tx) = server.shutdown_tx.take() {
                let _ = tx.send(());
            }
            if let Some(handle) = server.handle.take() {
                if !handle.is_finished() {
                    handle.abort();
                }
            }
        }
    }
}
