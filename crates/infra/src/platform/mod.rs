//! Platform-specific authentication surfaces

pub mod browser;

pub use browser::{BrowserSurfaceFactory, RedirectRelay, SystemBrowserSurface};
