//! Represents a user identity record.
//!
//! Authentication mechanics (password hashing, sessions) belong to an
//! external identity collaborator; the service only needs a stable id to
//! attribute and filter pastes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A registered user.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct User {
    /// Internal UUID, used opaquely as a paste owner reference.
    pub id: Uuid,

    /// Unique email address.
    pub email: String,

    /// Display name.
    pub name: String,

    /// When this user registered.
    pub created_at: DateTime<Utc>,
}
