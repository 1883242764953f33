// Public API - what other modules can use
pub use handlers::{current_user, debug_sessions, login, logout, update_profile};
pub use service::AuthService;
pub use token::RequestToken;

// Internal modules
pub mod audit;
pub mod generators;
mod handlers;
pub mod models;
pub mod repository;
pub mod service;
mod token;
