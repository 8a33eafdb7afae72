//! UI adapters

pub mod navigator;

pub use navigator::ConsoleNavigator;
