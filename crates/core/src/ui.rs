//! UI-side consumer of authentication results
//!
//! Turns the first [`HostMessage`](authdesk_domain::HostMessage) that arrives after a login into exactly
//! one navigation: [`Route::Home`] on success, [`Route::Unauthorized`]
//! otherwise.

use std::sync::Arc;

use authdesk_domain::Result;
use tracing::{info, warn};

use crate::ipc::UiEndpoint;
use crate::ports::{Navigator, Route};

pub struct UiSignalConsumer {
    endpoint: UiEndpoint,
    navigator: Arc<dyn Navigator>,
}

impl UiSignalConsumer {
    #[must_use]
    pub fn new(endpoint: UiEndpoint, navigator: Arc<dyn Navigator>) -> Self {
        Self { endpoint, navigator }
    }

    /// Endpoint for sending further commands (logout, refresh).
    #[must_use]
    pub fn endpoint(&self) -> &UiEndpoint {
        &self.endpoint
    }

    /// Ask the host to log in, then resolve the outcome.
    ///
    /// # Errors
    /// Returns `AuthDeskError::Ipc` if the host is gone, or the navigator's
    /// error.
    pub async fn log_in(&mut self) -> Result<bool> {
        self.endpoint.login()?;
        self.await_result().await
    }

    /// Wait for the next authentication result and navigate once.
    ///
    /// A closed channel counts as not logged in.
    ///
    /// # Errors
    /// Returns the navigator's error.
    pub async fn await_result(&mut self) -> Result<bool> {
        let logged_in = match self.endpoint.recv().await {
            Some(message) => message.is_logged_in(),
            None => {
                warn!("Host closed before reporting an authentication result");
                false
            }
        };

        let route = if logged_in { Route::Home } else { Route::Unauthorized };
        info!(logged_in, route = route.path(), "Authentication resolved");
        self.navigator.navigate(route).await?;
        Ok(logged_in)
    }
}
