//! Application context - dependency injection container

use std::sync::Arc;
use std::time::Duration;

use authdesk_common::auth::KeychainTokenStore;
use authdesk_common::{HttpTokenClient, TokenEndpoint, TokenStore};
use authdesk_core::{
    bridge, AuthOrchestrator, AuthPorts, Navigator, RedirectCatcher, StartupMode, SurfaceFactory,
    UiSignalConsumer,
};
use authdesk_domain::{AuthDeskError, AuthState, Config, Result};
use authdesk_infra::{BrowserSurfaceFactory, LoopbackCatcher, RedirectRelay};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
const LOGOUT_TIMEOUT: Duration = Duration::from_secs(60);

/// Replaceable services behind the orchestrator.
pub struct AuthServices {
    pub store: Arc<dyn TokenStore>,
    pub endpoint: Arc<dyn TokenEndpoint>,
    pub surfaces: Arc<dyn SurfaceFactory>,
    /// Receives the URLs the catcher answers, for surfaces that cannot see
    /// their own navigations.
    pub relay: Arc<RedirectRelay>,
}

impl AuthServices {
    /// Keychain store, HTTP token client and system browser.
    #[must_use]
    pub fn platform(config: &Config) -> Self {
        let relay = RedirectRelay::new();
        Self {
            store: Arc::new(KeychainTokenStore::new(
                config.storage.service_name.clone(),
                &config.catcher.redirect_uri(),
            )),
            endpoint: Arc::new(HttpTokenClient::new(&config.identity)),
            surfaces: Arc::new(BrowserSurfaceFactory::new(Arc::clone(&relay))),
            relay,
        }
    }
}

/// Application context - holds the running orchestrator and the UI side
pub struct AppContext {
    pub config: Config,
    pub consumer: UiSignalConsumer,
    state: watch::Receiver<AuthState>,
    signouts: watch::Receiver<u64>,
    catcher: Arc<LoopbackCatcher>,
    task: JoinHandle<()>,
}

impl AppContext {
    /// Start with platform services. Must be called inside a Tokio runtime.
    ///
    /// # Errors
    /// Returns `AuthDeskError::Config` if the configuration is invalid.
    pub fn new(
        config: Config,
        navigator: Arc<dyn Navigator>,
        startup: StartupMode,
    ) -> Result<Self> {
        let services = AuthServices::platform(&config);
        Self::with_services(config, services, navigator, startup)
    }

    /// Start with explicit services.
    ///
    /// # Errors
    /// Returns `AuthDeskError::Config` if the configuration is invalid.
    pub fn with_services(
        config: Config,
        services: AuthServices,
        navigator: Arc<dyn Navigator>,
        startup: StartupMode,
    ) -> Result<Self> {
        let catcher = Arc::new(
            LoopbackCatcher::new(config.catcher.clone()).with_observer(services.relay.clone()),
        );
        let (ui, host) = bridge();
        let (commands, sender) = host.split();

        let orchestrator = AuthOrchestrator::new(
            config.clone(),
            AuthPorts {
                surfaces: services.surfaces,
                catcher: catcher.clone(),
                endpoint: services.endpoint,
                store: services.store,
                ipc: Arc::new(sender),
            },
        )?;
        let state = orchestrator.subscribe();
        let signouts = orchestrator.subscribe_signouts();
        let task = tokio::spawn(orchestrator.run_with(startup, commands));

        info!(redirect_uri = %config.catcher.redirect_uri(), ?startup, "AuthDesk context started");
        Ok(Self {
            config,
            consumer: UiSignalConsumer::new(ui, navigator),
            state,
            signouts,
            catcher,
            task,
        })
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Sign out and wait until the orchestrator has handled the request.
    ///
    /// # Errors
    /// Returns `AuthDeskError::Ipc` if the orchestrator is gone, or
    /// `AuthDeskError::Internal` if signing out does not settle in time.
    pub async fn logout(&mut self) -> Result<()> {
        let before = *self.signouts.borrow_and_update();
        self.consumer.endpoint().logout()?;

        let settled = self.signouts.wait_for(|count| *count > before);
        match tokio::time::timeout(LOGOUT_TIMEOUT, settled).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(_)) => Err(AuthDeskError::Ipc("orchestrator stopped".to_string())),
            Err(_) => Err(AuthDeskError::Internal("logout did not complete".to_string())),
        }
    }

    /// Close the command channel and wait for the orchestrator to release
    /// its resources.
    pub async fn shutdown(self) {
        let Self { consumer, task, catcher, .. } = self;
        drop(consumer);

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
            Ok(Ok(())) => info!("AuthDesk context stopped"),
            Ok(Err(err)) => warn!(error = %err, "Orchestrator task failed"),
            Err(_) => {
                warn!("Orchestrator did not stop in time");
                catcher.stop().await;
            }
        }
    }
}
