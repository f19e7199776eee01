// Library crate for the session token service
// This file exposes the public API for integration tests

pub mod app;
pub mod config;
pub mod session;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use app::build_router;
pub use config::AppConfig;
pub use session::{
    repository::{InMemorySessionRepository, PostgresSessionRepository, SessionRepository},
    service::SessionService,
};
pub use shared::{AppError, AppState};
