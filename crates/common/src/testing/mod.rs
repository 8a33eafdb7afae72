//! Testing utilities
//!
//! - **[`mocks`]**: in-memory token store and scripted token endpoint
//!
//! ```rust
//! use authdesk_common::testing::{MemoryTokenStore, MockTokenEndpoint};
//!
//! let store = MemoryTokenStore::new();
//! let endpoint = MockTokenEndpoint::new();
//! endpoint.push_success(r#"{"access_token":"T","refresh_token":"R"}"#);
//! assert!(endpoint.requests().is_empty());
//! # drop(store);
//! ```

pub mod mocks;

pub use mocks::{MemoryTokenStore, MockTokenEndpoint};
