//! # AuthDesk Core
//!
//! Authentication orchestration logic - no platform or network code.
//!
//! This crate contains:
//! - Port interfaces for the surface, redirect catcher, IPC and navigation
//! - The per-attempt authentication session
//! - The orchestrator state machine and its event loop
//! - The in-process IPC bridge and the UI-side signal consumer
//!
//! ## Architecture Principles
//! - Depends only on `authdesk-domain` and `authdesk-common`
//! - Every external effect goes through a trait in [`ports`]
//! - All state mutation happens on the orchestrator task

pub mod auth;
pub mod ipc;
pub mod ports;
pub mod ui;

pub use auth::orchestrator::{AuthOrchestrator, AuthPorts, StartupMode};
pub use auth::session::{AuthSession, RedirectOutcome, SessionPurpose};
pub use ipc::{bridge, HostEndpoint, HostSender, UiEndpoint};
pub use ports::{
    AuthenticationSurface, IpcChannel, Navigator, RedirectCatcher, Route, SessionId,
    SurfaceEvent, SurfaceEventKind, SurfaceEventSink, SurfaceFactory,
};
pub use ui::UiSignalConsumer;
