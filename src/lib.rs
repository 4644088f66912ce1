pub mod auth;
pub mod calendar;
pub mod config;
pub mod types;

// Re-export commonly used types
pub use auth::{AuthError, AuthenticatedClient, OAuthFlow};
pub use calendar::{CalendarClient, CalendarError, EventPatch};
pub use config::Config;
pub use types::{Event, EventDateTime, TokenRecord};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
