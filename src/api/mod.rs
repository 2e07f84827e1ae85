//! HTTP surface over the conversation core

pub mod agents;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod tokens;

pub use handlers::AppState;
pub use models::{error_response, ApiError};
pub use routes::build_router;
