//! Defines routes for the paste lifecycle API.
//!
//! ## Structure
//! - **Paste endpoints**
//!   - `POST   /api/pastes` — create
//!   - `GET    /api/pastes` — public listing
//!   - `GET    /api/pastes/{id}` — resolve for display (no view recorded)
//!   - `DELETE /api/pastes/{id}` — explicit deletion
//!   - `POST   /api/pastes/{id}/views` — record a qualifying view
//!   - `POST   /api/pastes/{id}/unlock` — verify a password attempt
//!
//! - **User endpoints**
//!   - `POST   /api/users` — register
//!   - `GET    /api/users/{id}` — fetch a user record
//!   - `GET    /api/users/{id}/pastes` — owner listing
//!
//! The router carries shared state (`PasteService`) to all handlers.

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        paste_handlers::{
            create_paste, delete_paste, get_paste, list_public_pastes, record_view, unlock_paste,
        },
        user_handlers::{get_user, list_user_pastes, register_user},
    },
    services::paste_service::PasteService,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for the whole API surface.
pub fn routes() -> Router<PasteService> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // paste endpoints
        .route("/api/pastes", post(create_paste).get(list_public_pastes))
        .route("/api/pastes/{id}", get(get_paste).delete(delete_paste))
        .route("/api/pastes/{id}/views", post(record_view))
        .route("/api/pastes/{id}/unlock", post(unlock_paste))
        // user endpoints
        .route("/api/users", post(register_user))
        .route("/api/users/{id}", get(get_user))
        .route("/api/users/{id}/pastes", get(list_user_pastes))
}
