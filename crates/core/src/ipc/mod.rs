//! In-process IPC between the UI and the orchestrator

pub mod bridge;

pub use bridge::{bridge, HostEndpoint, HostSender, UiEndpoint};
