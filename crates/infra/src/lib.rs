//! # AuthDesk Infrastructure
//!
//! Infrastructure implementations of core authentication ports.
//!
//! This crate contains:
//! - The loopback redirect catcher (axum)
//! - The system browser authentication surface
//! - Configuration loading (environment, JSON, TOML)
//! - Tracing subscriber setup
//!
//! ## Architecture
//! - Implements traits defined in `authdesk-core`
//! - Contains all "impure" code (sockets, processes, environment)

pub mod config;
pub mod http;
pub mod observability;
pub mod platform;

// Re-export commonly used items
pub use http::{LoopbackCatcher, RequestObserver};
pub use observability::{init_tracing, LogFormat};
pub use platform::{BrowserSurfaceFactory, RedirectRelay, SystemBrowserSurface};
