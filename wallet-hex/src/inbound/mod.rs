//! HTTP Inbound Adapter
//!
//! Axum-based HTTP server that drives the wallet service.

mod auth;
mod handlers;
mod server;

pub use handlers::{ApiError, AppState, AuthenticatedUser};
pub use server::HttpServer;
