//! Represents a paste — a stored text payload addressable by a short id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Title applied when a submission carries none.
pub const DEFAULT_TITLE: &str = "Untitled";

/// Language tag applied when a submission carries none.
pub const DEFAULT_LANGUAGE: &str = "plaintext";

/// A stored paste record.
///
/// This is the persisted shape; policy (expiry, burn-after-read, password
/// gating) is applied by `PasteService`, never here. The `password` field is
/// skipped on serialization so it can never leak through a JSON response.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Paste {
    /// Short opaque identifier, unique, immutable after creation.
    pub id: String,

    /// Display title; defaults to "Untitled".
    pub title: String,

    /// The text payload. Required and non-empty at creation.
    pub content: String,

    /// Syntax-highlighting tag (e.g. "rust", "plaintext").
    pub language: String,

    /// Set once at creation, immutable.
    pub created_at: DateTime<Utc>,

    /// Absolute expiry timestamp; `None` means the paste never expires.
    pub expire_at: Option<DateTime<Utc>>,

    /// Weak reference to the owning user. Deleting the user must not
    /// cascade-delete pastes.
    pub owner_id: Option<Uuid>,

    /// Excluded from public listings; direct-link access is unaffected.
    pub is_private: bool,

    /// Whether a password gate applies to content rendering.
    pub is_password_protected: bool,

    /// Stored verbatim; compared with exact string equality on verification.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Marks the paste for deletion after its first qualifying view.
    pub burn_after_read: bool,

    /// Incremented only by qualifying views; starts at 0.
    pub view_count: i64,
}

impl Paste {
    /// Whether `expire_at` is set and at-or-before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_at.is_some_and(|at| at <= now)
    }

    /// Drop the stored password before handing the record to a caller.
    pub fn sanitized(mut self) -> Self {
        self.password = None;
        self
    }
}

/// Input for creating a paste.
#[derive(Debug, Clone, Deserialize)]
pub struct NewPaste {
    pub title: Option<String>,
    pub content: String,
    pub language: Option<String>,
    pub expire_at: Option<DateTime<Utc>>,
    pub owner_id: Option<Uuid>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_password_protected: bool,
    pub password: Option<String>,
    #[serde(default)]
    pub burn_after_read: bool,
}
