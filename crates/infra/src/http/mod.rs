//! Loopback HTTP listener for the OAuth redirect

pub mod catcher;

pub use catcher::{LoopbackCatcher, RequestObserver};
