//! # AuthDesk App
//!
//! Application layer - wiring and main entry point.
//!
//! This crate contains:
//! - Application context (dependency injection)
//! - UI adapters (navigation)
//!
//! ## Architecture
//! - Depends on `domain`, `common`, `core`, and `infra`
//! - Wires the orchestrator to its platform ports

pub mod adapters;
pub mod context;

pub use adapters::ConsoleNavigator;
pub use context::{AppContext, AuthServices};
