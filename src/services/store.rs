//! src/services/store.rs
//!
//! Keyed persistence for paste and user records. The store is policy-free:
//! expiry enforcement, burn-after-read consumption, and password gating all
//! live in `PasteService`. Implementations guarantee only the atomicity of a
//! single `put`/`get`/`delete`; the service composes those into correct
//! multi-step policies under its own per-id locking.

use crate::models::{paste::Paste, user::User};
use async_trait::async_trait;
use std::{collections::HashMap, sync::Arc};
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email `{0}` is already registered")]
    DuplicateEmail(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Capability contract for durable keyed persistence.
///
/// Any keyed backend (in-process map, embedded file, remote database)
/// satisfying this contract is conformant; `PasteService` depends only on the
/// trait, never on a concrete backing technology.
#[async_trait]
pub trait PasteStore: Send + Sync {
    /// Insert or overwrite a paste by `id`.
    async fn put(&self, paste: &Paste) -> StoreResult<()>;

    /// Raw lookup by `id`; no expiry or burn logic applied.
    async fn get(&self, id: &str) -> StoreResult<Option<Paste>>;

    /// Remove by `id`; returns whether a record existed.
    async fn delete(&self, id: &str) -> StoreResult<bool>;

    /// All pastes attributed to `owner_id`, newest first, unfiltered.
    async fn list_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Paste>>;

    /// All non-private pastes, newest first, unfiltered beyond privacy.
    async fn list_public(&self) -> StoreResult<Vec<Paste>>;

    /// Insert a user; the email must be unique.
    async fn put_user(&self, user: &User) -> StoreResult<()>;

    /// Look up a user by id.
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> StoreResult<()>;
}

const PASTE_COLUMNS: &str = "id, title, content, language, created_at, expire_at, owner_id, \
     is_private, is_password_protected, password, burn_after_read, view_count";

/// SQLite-backed store. Rows live in the `pastes` and `users` tables created
/// by `migrations/0001_init.sql`.
#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<SqlitePool>,
}

impl SqliteStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl PasteStore for SqliteStore {
    async fn put(&self, paste: &Paste) -> StoreResult<()> {
        // Upsert keyed by id. `created_at` is immutable and deliberately
        // excluded from the conflict update.
        sqlx::query(
            "INSERT INTO pastes (id, title, content, language, created_at, expire_at, owner_id,
                                 is_private, is_password_protected, password, burn_after_read, view_count)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 content = excluded.content,
                 language = excluded.language,
                 expire_at = excluded.expire_at,
                 owner_id = excluded.owner_id,
                 is_private = excluded.is_private,
                 is_password_protected = excluded.is_password_protected,
                 password = excluded.password,
                 burn_after_read = excluded.burn_after_read,
                 view_count = excluded.view_count",
        )
        .bind(&paste.id)
        .bind(&paste.title)
        .bind(&paste.content)
        .bind(&paste.language)
        .bind(paste.created_at)
        .bind(paste.expire_at)
        .bind(paste.owner_id)
        .bind(paste.is_private)
        .bind(paste.is_password_protected)
        .bind(&paste.password)
        .bind(paste.burn_after_read)
        .bind(paste.view_count)
        .execute(&*self.db)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Paste>> {
        let paste = sqlx::query_as::<_, Paste>(&format!(
            "SELECT {PASTE_COLUMNS} FROM pastes WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(paste)
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM pastes WHERE id = ?")
            .bind(id)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Paste>> {
        let pastes = sqlx::query_as::<_, Paste>(&format!(
            "SELECT {PASTE_COLUMNS} FROM pastes WHERE owner_id = ? ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(pastes)
    }

    async fn list_public(&self) -> StoreResult<Vec<Paste>> {
        let pastes = sqlx::query_as::<_, Paste>(&format!(
            "SELECT {PASTE_COLUMNS} FROM pastes WHERE is_private = 0 ORDER BY created_at DESC"
        ))
        .fetch_all(&*self.db)
        .await?;
        Ok(pastes)
    }

    async fn put_user(&self, user: &User) -> StoreResult<()> {
        match sqlx::query(
            "INSERT INTO users (id, email, name, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.created_at)
        .execute(&*self.db)
        .await
        {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::DuplicateEmail(user.email.clone()))
            }
            Err(err) => Err(StoreError::Sqlx(err)),
        }
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, email, name, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&*self.db)
        .await?;
        Ok(user)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }
}

/// In-process store with no durability. Used by tests and suitable for
/// single-node throwaway deployments.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    pastes: HashMap<String, Paste>,
    users: HashMap<Uuid, User>,
}

#[async_trait]
impl PasteStore for MemoryStore {
    async fn put(&self, paste: &Paste) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        inner.pastes.insert(paste.id.clone(), paste.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Paste>> {
        let inner = self.inner.read().await;
        Ok(inner.pastes.get(id).cloned())
    }

    async fn delete(&self, id: &str) -> StoreResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.pastes.remove(id).is_some())
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> StoreResult<Vec<Paste>> {
        let inner = self.inner.read().await;
        let mut pastes: Vec<Paste> = inner
            .pastes
            .values()
            .filter(|p| p.owner_id == Some(owner_id))
            .cloned()
            .collect();
        pastes.sort_by_key(|p| std::cmp::Reverse(p.created_at));
        Ok(pastes)
    }

    async fn list_public(&self) -> StoreResult<Vec<Paste>> {
        let inner = self.inner.read().await;
        let mut pastes: Vec<Paste> = inner
            .pastes
            .values()
            .filter(|p| !p.is_private)
            .cloned()
            .collect();
        pastes.sort_by_key(|p| std::cmp::Reverse(p.created_at));
        Ok(pastes)
    }

    async fn put_user(&self, user: &User) -> StoreResult<()> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            return Err(StoreError::DuplicateEmail(user.email.clone()));
        }
        inner.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&id).cloned())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

/// Run the embedded schema statements. Every statement uses `IF NOT EXISTS`,
/// so this is safe to run on every startup.
pub async fn run_migrations(db: &SqlitePool) -> Result<(), sqlx::Error> {
    const INIT_SQL: &str = include_str!("../../migrations/0001_init.sql");

    let statements = INIT_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::debug!("Running {} migration statements", statements.len());
    for stmt in statements {
        sqlx::query(stmt).execute(db).await?;
    }
    Ok(())
}

/// Return true if a SQLx error indicates a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.message().to_ascii_lowercase().contains("unique")
    )
}
