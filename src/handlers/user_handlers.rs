//! HTTP handlers for user registration and owner listings.

use crate::{
    errors::AppError,
    handlers::paste_handlers::PasteView,
    services::paste_service::PasteService,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
}

/// `POST /api/users` — register a user identity record.
pub async fn register_user(
    State(service): State<PasteService>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = service.register_user(&body.email, &body.name).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /api/users/{id}` — fetch a user record.
pub async fn get_user(
    State(service): State<PasteService>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    match service.get_user(id).await? {
        Some(user) => Ok(Json(user)),
        None => Err(AppError::not_found("user not found")),
    }
}

/// `GET /api/users/{id}/pastes` — "my pastes" listing for an owner.
pub async fn list_user_pastes(
    State(service): State<PasteService>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<PasteView>>, AppError> {
    let pastes = service.list_for_owner(id).await?;
    Ok(Json(
        pastes
            .into_iter()
            .map(|p| PasteView::from_paste(p, false))
            .collect(),
    ))
}
