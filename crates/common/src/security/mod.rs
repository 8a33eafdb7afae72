//! Platform secret storage
//!
//! Generic keychain access lives here; token-specific storage is layered on
//! top in `auth::keychain`.

pub mod keychain;

pub use keychain::{KeychainError, KeychainProvider};
