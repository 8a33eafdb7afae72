//! Bidirectional message bridge
//!
//! Two unbounded FIFO queues: [`UiCommand`] from the UI to the host and
//! [`HostMessage`] from the host to the UI. Delivery is at most once; a
//! message sent after the other side is dropped is lost and reported as
//! `AuthDeskError::Ipc`.

use authdesk_domain::{AuthDeskError, HostMessage, Result, UiCommand};
use tokio::sync::mpsc;
use tracing::trace;

use crate::ports::IpcChannel;

/// Create a connected pair of endpoints.
#[must_use]
pub fn bridge() -> (UiEndpoint, HostEndpoint) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (message_tx, message_rx) = mpsc::unbounded_channel();

    let ui = UiEndpoint { commands: command_tx, messages: message_rx };
    let host = HostEndpoint { commands: command_rx, messages: HostSender { tx: message_tx } };
    (ui, host)
}

/// UI side: sends commands, receives host messages.
#[derive(Debug)]
pub struct UiEndpoint {
    commands: mpsc::UnboundedSender<UiCommand>,
    messages: mpsc::UnboundedReceiver<HostMessage>,
}

impl UiEndpoint {
    /// # Errors
    /// Returns `AuthDeskError::Ipc` if the host side has gone away.
    pub fn send(&self, command: UiCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| AuthDeskError::Ipc("host endpoint closed".to_string()))
    }

    /// # Errors
    /// See [`Self::send`].
    pub fn login(&self) -> Result<()> {
        self.send(UiCommand::Login)
    }

    /// # Errors
    /// See [`Self::send`].
    pub fn logout(&self) -> Result<()> {
        self.send(UiCommand::Logout)
    }

    /// # Errors
    /// See [`Self::send`].
    pub fn refresh_access_token(&self, refresh_token: impl Into<String>) -> Result<()> {
        self.send(UiCommand::RefreshAccessToken(refresh_token.into()))
    }

    /// Next host message, `None` once the host side is dropped and drained.
    pub async fn recv(&mut self) -> Option<HostMessage> {
        self.messages.recv().await
    }
}

/// Host side: owns the command queue and the sending half towards the UI.
#[derive(Debug)]
pub struct HostEndpoint {
    commands: mpsc::UnboundedReceiver<UiCommand>,
    messages: HostSender,
}

impl HostEndpoint {
    /// Split into the command queue (handed to the orchestrator loop) and
    /// the message sender (handed to the orchestrator as its IPC port).
    #[must_use]
    pub fn split(self) -> (mpsc::UnboundedReceiver<UiCommand>, HostSender) {
        (self.commands, self.messages)
    }
}

/// Cloneable sender of [`HostMessage`]s.
#[derive(Debug, Clone)]
pub struct HostSender {
    tx: mpsc::UnboundedSender<HostMessage>,
}

impl IpcChannel for HostSender {
    fn send(&self, message: HostMessage) -> Result<()> {
        trace!(logged_in = message.is_logged_in(), "Sending host message");
        self.tx.send(message).map_err(|_| AuthDeskError::Ipc("UI endpoint closed".to_string()))
    }
}
