//! HTTP handlers grouped by concern.

pub mod health_handlers;
pub mod paste_handlers;
pub mod user_handlers;
