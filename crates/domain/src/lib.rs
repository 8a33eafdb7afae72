//! # AuthDesk Domain
//!
//! Domain types shared by every AuthDesk crate.
//!
//! This crate contains:
//! - The application error type and `Result` alias
//! - Static configuration structures (identity provider, redirect catcher,
//!   token storage)
//! - The authentication state enum and the IPC message vocabulary
//!
//! ## Architecture
//! - No dependencies on other AuthDesk crates
//! - Only external dependencies allowed
//! - Pure data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
