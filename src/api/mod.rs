//! API module for all HTTP handlers

pub mod handlers;
pub mod webhook;

// Re-export handlers
pub use handlers::{health, not_found};
pub use webhook::handle_webhook;
