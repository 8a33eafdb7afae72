//! In-memory doubles for the token store and token endpoint.
//!
//! Both are cheap to clone; clones share state so a test can keep a handle
//! while the orchestrator owns another.

#![allow(clippy::missing_panics_doc)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::auth::client::TokenClientError;
use crate::auth::traits::{TokenEndpoint, TokenStore, TokenStoreError};
use crate::auth::types::{GrantRequest, RefreshTokenRecord, TokenGrant};

#[derive(Debug, Default)]
struct StoreState {
    record: Option<RefreshTokenRecord>,
    fail_reads: bool,
    fail_writes: bool,
    writes: usize,
    clears: usize,
}

/// [`TokenStore`] that keeps the record in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `record` already stored.
    #[must_use]
    pub fn with_record(record: RefreshTokenRecord) -> Self {
        let store = Self::new();
        store.state.lock().unwrap().record = Some(record);
        store
    }

    /// Currently stored record.
    #[must_use]
    pub fn record(&self) -> Option<RefreshTokenRecord> {
        self.state.lock().unwrap().record.clone()
    }

    /// Decoded token of the stored record.
    #[must_use]
    pub fn token(&self) -> Option<String> {
        self.record().and_then(|r| r.token().ok())
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.state.lock().unwrap().fail_reads = fail;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    /// Number of successful `save` calls.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.state.lock().unwrap().writes
    }

    /// Number of `clear` calls.
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.state.lock().unwrap().clears
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<RefreshTokenRecord>, TokenStoreError> {
        let state = self.state.lock().unwrap();
        if state.fail_reads {
            return Err(TokenStoreError::Access("simulated read failure".to_string()));
        }
        Ok(state.record.clone())
    }

    async fn save(&self, record: &RefreshTokenRecord) -> Result<(), TokenStoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_writes {
            return Err(TokenStoreError::Access("simulated write failure".to_string()));
        }
        state.record = Some(record.clone());
        state.writes += 1;
        Ok(())
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        let mut state = self.state.lock().unwrap();
        state.record = None;
        state.clears += 1;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct EndpointState {
    requests: Vec<GrantRequest>,
    responses: VecDeque<Result<TokenGrant, TokenClientError>>,
    held: bool,
}

/// Scripted [`TokenEndpoint`] that records every grant it receives.
///
/// Responses are consumed in order; when the script is empty a transport
/// error is returned. [`Self::hold`] parks every call until
/// [`Self::release`], which lets a test observe the exchanging state.
#[derive(Debug, Clone, Default)]
pub struct MockTokenEndpoint {
    state: Arc<Mutex<EndpointState>>,
    gate: Arc<Notify>,
}

impl MockTokenEndpoint {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a 200 response with `body`.
    pub fn push_success(&self, body: &str) {
        let result = TokenGrant::from_response(200, body.to_string());
        self.state.lock().unwrap().responses.push_back(result);
    }

    /// Queue a response with an arbitrary status and body.
    pub fn push_response(&self, status: u16, body: &str) {
        let result = TokenGrant::from_response(status, body.to_string());
        self.state.lock().unwrap().responses.push_back(result);
    }

    /// Queue a transport failure.
    pub fn push_transport_error(&self, message: &str) {
        self.state
            .lock()
            .unwrap()
            .responses
            .push_back(Err(TokenClientError::Transport(message.to_string())));
    }

    /// Park calls until [`Self::release`].
    pub fn hold(&self) {
        self.state.lock().unwrap().held = true;
    }

    /// Let parked and future calls complete.
    pub fn release(&self) {
        self.state.lock().unwrap().held = false;
        self.gate.notify_waiters();
    }

    /// Grants received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<GrantRequest> {
        self.state.lock().unwrap().requests.clone()
    }
}

#[async_trait]
impl TokenEndpoint for MockTokenEndpoint {
    async fn exchange(&self, grant: GrantRequest) -> Result<TokenGrant, TokenClientError> {
        self.state.lock().unwrap().requests.push(grant);

        loop {
            let notified = self.gate.notified();
            if !self.state.lock().unwrap().held {
                break;
            }
            notified.await;
        }

        self.state
            .lock()
            .unwrap()
            .responses
            .pop_front()
            .unwrap_or_else(|| Err(TokenClientError::Transport("no scripted response".to_string())))
    }
}
