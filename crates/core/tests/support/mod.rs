//! Shared test helpers for `authdesk-core` integration tests.
//!
//! Recording fakes for every orchestrator port plus a [`Harness`] that wires
//! them to a running orchestrator task.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use authdesk_common::testing::{MemoryTokenStore, MockTokenEndpoint};
use authdesk_core::{
    bridge, AuthOrchestrator, AuthPorts, AuthenticationSurface, RedirectCatcher, StartupMode,
    SurfaceEventSink, SurfaceFactory, UiEndpoint,
};
use authdesk_domain::{AuthDeskError, AuthState, Config, HostMessage, IdentityConfig, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use url::Url;

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn test_config() -> Config {
    Config {
        identity: IdentityConfig {
            tenant_id: "tenant-1".into(),
            client_id: "client-1".into(),
            scope: "openid offline_access".into(),
            ..IdentityConfig::default()
        },
        ..Config::default()
    }
}

/// What a fake surface has been asked to do.
#[derive(Debug, Default)]
pub struct SurfaceRecord {
    pub shown: AtomicBool,
    pub closed: AtomicBool,
    pub navigations: Mutex<Vec<Url>>,
}

impl SurfaceRecord {
    pub fn is_shown(&self) -> bool {
        self.shown.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<Url> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn last_navigation(&self) -> Option<Url> {
        self.navigations.lock().unwrap().last().cloned()
    }

    /// Value of `key` on the most recent navigation.
    pub fn query(&self, key: &str) -> Option<String> {
        self.last_navigation()?
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }
}

struct FakeSurface {
    record: Arc<SurfaceRecord>,
}

#[async_trait]
impl AuthenticationSurface for FakeSurface {
    async fn show(&self) -> Result<()> {
        self.record.shown.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn navigate(&self, url: &Url) -> Result<()> {
        self.record.navigations.lock().unwrap().push(url.clone());
        Ok(())
    }

    async fn close(&self) {
        self.record.closed.store(true, Ordering::SeqCst);
    }
}

/// Factory that keeps every surface it created along with its event sink.
#[derive(Default)]
pub struct RecordingSurfaceFactory {
    created: Mutex<Vec<(Arc<SurfaceRecord>, SurfaceEventSink)>>,
    fail: AtomicBool,
}

impl RecordingSurfaceFactory {
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub fn surface(&self, index: usize) -> Arc<SurfaceRecord> {
        Arc::clone(&self.created.lock().unwrap()[index].0)
    }

    pub fn sink(&self, index: usize) -> SurfaceEventSink {
        self.created.lock().unwrap()[index].1.clone()
    }

    pub fn latest(&self) -> (Arc<SurfaceRecord>, SurfaceEventSink) {
        let created = self.created.lock().unwrap();
        let (record, sink) = created.last().expect("no surface created yet");
        (Arc::clone(record), sink.clone())
    }
}

#[async_trait]
impl SurfaceFactory for RecordingSurfaceFactory {
    async fn create(&self, events: SurfaceEventSink) -> Result<Box<dyn AuthenticationSurface>> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AuthDeskError::Surface("window creation failed".into()));
        }
        let record = Arc::new(SurfaceRecord::default());
        self.created.lock().unwrap().push((Arc::clone(&record), events));
        Ok(Box::new(FakeSurface { record }))
    }
}

/// Catcher that only tracks whether it is bound.
#[derive(Default)]
pub struct FakeCatcher {
    running: AtomicBool,
    fail_bind: AtomicBool,
    starts: AtomicUsize,
    stops: AtomicUsize,
}

impl FakeCatcher {
    pub fn failing() -> Self {
        let catcher = Self::default();
        catcher.fail_bind.store(true, Ordering::SeqCst);
        catcher
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn is_running_now(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RedirectCatcher for FakeCatcher {
    async fn start(&self) -> Result<()> {
        if self.fail_bind.load(Ordering::SeqCst) {
            return Err(AuthDeskError::PortBind("localhost:4200 already in use".into()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// A running orchestrator plus handles on all of its fakes.
pub struct Harness {
    pub config: Config,
    pub surfaces: Arc<RecordingSurfaceFactory>,
    pub catcher: Arc<FakeCatcher>,
    pub endpoint: MockTokenEndpoint,
    pub store: MemoryTokenStore,
    pub ui: UiEndpoint,
    pub state: watch::Receiver<AuthState>,
    pub signouts: watch::Receiver<u64>,
    pub task: JoinHandle<()>,
}

impl Harness {
    pub fn start(store: MemoryTokenStore, endpoint: MockTokenEndpoint) -> Self {
        Self::start_with(store, endpoint, FakeCatcher::default())
    }

    pub fn start_with(
        store: MemoryTokenStore,
        endpoint: MockTokenEndpoint,
        catcher: FakeCatcher,
    ) -> Self {
        Self::start_mode(store, endpoint, catcher, StartupMode::SignIn)
    }

    pub fn start_passive(store: MemoryTokenStore, endpoint: MockTokenEndpoint) -> Self {
        Self::start_mode(store, endpoint, FakeCatcher::default(), StartupMode::Passive)
    }

    fn start_mode(
        store: MemoryTokenStore,
        endpoint: MockTokenEndpoint,
        catcher: FakeCatcher,
        startup: StartupMode,
    ) -> Self {
        let config = test_config();
        let surfaces = Arc::new(RecordingSurfaceFactory::default());
        let catcher = Arc::new(catcher);
        let (ui, host) = bridge();
        let (commands, sender) = host.split();

        let orchestrator = AuthOrchestrator::new(
            config.clone(),
            AuthPorts {
                surfaces: surfaces.clone(),
                catcher: catcher.clone(),
                endpoint: Arc::new(endpoint.clone()),
                store: Arc::new(store.clone()),
                ipc: Arc::new(sender),
            },
        )
        .expect("valid test config");
        let state = orchestrator.subscribe();
        let signouts = orchestrator.subscribe_signouts();
        let task = tokio::spawn(orchestrator.run_with(startup, commands));

        Self { config, surfaces, catcher, endpoint, store, ui, state, signouts, task }
    }

    pub fn redirect_uri(&self) -> String {
        self.config.catcher.redirect_uri()
    }

    /// Redirect URL as the identity provider would produce it.
    pub fn redirect(&self, query: &str) -> Url {
        Url::parse(&format!("{}/?{}", self.redirect_uri(), query)).unwrap()
    }

    pub async fn wait_for(&mut self, expected: AuthState) {
        tokio::time::timeout(TIMEOUT, self.state.wait_for(|state| *state == expected))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {expected}"))
            .expect("orchestrator dropped its state channel");
    }

    pub async fn next_message(&mut self) -> HostMessage {
        tokio::time::timeout(TIMEOUT, self.ui.recv())
            .await
            .expect("timed out waiting for a host message")
            .expect("host endpoint closed")
    }

    pub async fn wait_for_signouts(&mut self, count: u64) {
        tokio::time::timeout(TIMEOUT, self.signouts.wait_for(|n| *n >= count))
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for sign-out #{count}"))
            .expect("orchestrator dropped its sign-out channel");
    }

    pub fn current(&self) -> AuthState {
        *self.state.borrow()
    }

    /// Sign in through the interactive path, returning the token body.
    pub async fn sign_in(&mut self, body: &str) -> HostMessage {
        self.wait_for(AuthState::AwaitingUserAuth).await;
        let (surface, sink) = self.surfaces.latest();
        let state = surface.query("state").expect("authorize url carries state");

        self.endpoint.push_success(body);
        sink.request_completed(self.redirect(&format!("code=ABC&state={state}")));
        self.wait_for(AuthState::Authenticated).await;
        self.next_message().await
    }
}
