//! Terminal stand-in for the UI router.

use async_trait::async_trait;
use authdesk_core::{Navigator, Route};
use authdesk_domain::Result;
use tracing::info;

#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNavigator;

#[async_trait]
impl Navigator for ConsoleNavigator {
    async fn navigate(&self, route: Route) -> Result<()> {
        info!(route = route.path(), "Navigating");
        match route {
            Route::Home => println!("Signed in."),
            Route::Unauthorized => println!("Not signed in."),
        }
        Ok(())
    }
}
