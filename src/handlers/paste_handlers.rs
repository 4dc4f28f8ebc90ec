//! HTTP handlers for the paste lifecycle.
//!
//! Handlers are a thin presentation shim: they translate JSON bodies and path
//! segments into `PasteService` operations and map typed failures onto HTTP
//! statuses. Content of a password-protected paste is withheld until the
//! caller verifies through `POST /api/pastes/{id}/unlock`; the gate is
//! re-checked on every fresh view, never remembered server-side.

use crate::{
    errors::AppError,
    models::paste::{NewPaste, Paste},
    services::paste_service::PasteService,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response shape for a paste. `content` is absent while a password gate is
/// unsatisfied; `password` has no representation here at all.
#[derive(Debug, Serialize)]
pub struct PasteView {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub language: String,
    pub created_at: DateTime<Utc>,
    pub expire_at: Option<DateTime<Utc>>,
    pub owner_id: Option<Uuid>,
    pub is_private: bool,
    pub is_password_protected: bool,
    pub burn_after_read: bool,
    pub view_count: i64,
}

impl PasteView {
    pub(crate) fn from_paste(paste: Paste, unlocked: bool) -> Self {
        let reveal_content = unlocked || !paste.is_password_protected;
        Self {
            id: paste.id,
            title: paste.title,
            content: reveal_content.then_some(paste.content),
            language: paste.language,
            created_at: paste.created_at,
            expire_at: paste.expire_at,
            owner_id: paste.owner_id,
            is_private: paste.is_private,
            is_password_protected: paste.is_password_protected,
            burn_after_read: paste.burn_after_read,
            view_count: paste.view_count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paste: Option<PasteView>,
}

/// `POST /api/pastes` — create a paste.
pub async fn create_paste(
    State(service): State<PasteService>,
    Json(body): Json<NewPaste>,
) -> Result<impl IntoResponse, AppError> {
    let paste = service.create(body).await?;
    // The creator supplied any password, so content is shown back.
    Ok((StatusCode::CREATED, Json(PasteView::from_paste(paste, true))))
}

/// `GET /api/pastes` — public index listing.
pub async fn list_public_pastes(
    State(service): State<PasteService>,
) -> Result<Json<Vec<PasteView>>, AppError> {
    let pastes = service.list_public().await?;
    Ok(Json(
        pastes
            .into_iter()
            .map(|p| PasteView::from_paste(p, false))
            .collect(),
    ))
}

/// `GET /api/pastes/{id}` — resolve a paste for display.
///
/// Does not record a view; the caller reports a qualifying view separately
/// once any password gate has been satisfied and content is rendered.
pub async fn get_paste(
    State(service): State<PasteService>,
    Path(id): Path<String>,
) -> Result<Json<PasteView>, AppError> {
    let paste = service.resolve(&id).await?;
    Ok(Json(PasteView::from_paste(paste, false)))
}

/// `POST /api/pastes/{id}/views` — record one qualifying view.
pub async fn record_view(
    State(service): State<PasteService>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    service.record_qualifying_view(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/pastes/{id}/unlock` — verify a password attempt.
///
/// A wrong password is a normal `{"valid": false}` response, not an error.
pub async fn unlock_paste(
    State(service): State<PasteService>,
    Path(id): Path<String>,
    Json(body): Json<UnlockRequest>,
) -> Result<Json<UnlockResponse>, AppError> {
    let valid = service.verify_password(&id, &body.password).await?;
    if !valid {
        return Ok(Json(UnlockResponse {
            valid: false,
            paste: None,
        }));
    }

    let paste = service.resolve(&id).await?;
    Ok(Json(UnlockResponse {
        valid: true,
        paste: Some(PasteView::from_paste(paste, true)),
    }))
}

/// `DELETE /api/pastes/{id}` — explicit user-initiated deletion.
pub async fn delete_paste(
    State(service): State<PasteService>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    if service.delete(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("paste not found or expired"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::paste::{DEFAULT_LANGUAGE, DEFAULT_TITLE};

    fn protected_paste() -> Paste {
        Paste {
            id: "abcd1234".into(),
            title: DEFAULT_TITLE.into(),
            content: "hidden until unlocked".into(),
            language: DEFAULT_LANGUAGE.into(),
            created_at: Utc::now(),
            expire_at: None,
            owner_id: None,
            is_private: false,
            is_password_protected: true,
            password: Some("s3cr3t".into()),
            burn_after_read: false,
            view_count: 0,
        }
    }

    #[test]
    fn protected_view_withholds_content_until_unlocked() {
        let locked = PasteView::from_paste(protected_paste(), false);
        let json = serde_json::to_value(&locked).expect("serialize locked view");
        assert!(json.get("content").is_none());
        assert!(json.get("password").is_none());
        assert_eq!(json["is_password_protected"], true);

        let unlocked = PasteView::from_paste(protected_paste(), true);
        let json = serde_json::to_value(&unlocked).expect("serialize unlocked view");
        assert_eq!(json["content"], "hidden until unlocked");
        assert!(json.get("password").is_none());
    }

    #[test]
    fn unprotected_view_always_reveals_content() {
        let mut paste = protected_paste();
        paste.is_password_protected = false;
        paste.password = None;

        let view = PasteView::from_paste(paste, false);
        let json = serde_json::to_value(&view).expect("serialize view");
        assert_eq!(json["content"], "hidden until unlocked");
        assert!(json.get("password").is_none());
    }
}
