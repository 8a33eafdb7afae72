//! Authentication attempt lifecycle

pub mod orchestrator;
pub mod session;
