// Public API - what other modules can use
pub use handlers::{current_session, login, logout, logout_all, refresh};
pub use middleware::jwt_auth;
pub use types::{AccessClaims, AccessDetails, RefreshClaims, TokenPair, TokenResponse};

// Internal modules
pub mod cleanup_task;
pub mod errors;
pub mod extract;
mod handlers;
mod middleware;
pub mod models;
pub mod repository;
pub mod service;
pub mod token;
mod types;
