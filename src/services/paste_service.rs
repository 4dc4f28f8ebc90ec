//! src/services/paste_service.rs
//!
//! PasteService — the paste lifecycle engine. All paste reads and writes the
//! rest of the system performs go through here, never directly through the
//! store, which makes this the single writer gate for policy:
//!
//! - creation validation (content, expiry, password requirements)
//! - lazy expiry: every read path is the enforcement point, there is no
//!   background sweeper
//! - burn-after-read consumption: the first qualifying view renders, the
//!   access that would push `view_count` past 1 deletes the record
//! - password verification, with the stored password never leaving the engine
//!
//! Mutating sequences on a single paste run under a per-id async lock so two
//! concurrent view recordings cannot both observe the pre-burn state.

use crate::{
    models::{
        paste::{DEFAULT_LANGUAGE, DEFAULT_TITLE, NewPaste, Paste},
        user::User,
    },
    services::store::{PasteStore, StoreError},
};
use chrono::Utc;
use parking_lot::Mutex;
use rand::Rng;
use std::{collections::HashMap, sync::Arc};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;
use uuid::Uuid;

const PASTE_ID_LEN: usize = 8;
const ID_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

#[derive(Debug, Error)]
pub enum PasteError {
    /// Unknown, expired, or burned id. Deliberately indistinguishable so the
    /// response leaks nothing about paste history.
    #[error("paste not found or expired")]
    NotFound,
    #[error("invalid input: {0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type PasteResult<T> = Result<T, PasteError>;

/// The lifecycle engine. Cheap to clone; clones share the store and the lock
/// registry.
#[derive(Clone)]
pub struct PasteService {
    store: Arc<dyn PasteStore>,
    locks: IdLocks,
}

/// Registry of per-paste-id async mutexes. Entries are pruned once the record
/// they guard is deleted.
#[derive(Clone, Default)]
struct IdLocks {
    inner: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl IdLocks {
    fn for_id(&self, id: &str) -> Arc<AsyncMutex<()>> {
        self.inner
            .lock()
            .entry(id.to_string())
            .or_default()
            .clone()
    }

    /// Drop the registry entry for `id`. A caller still holding the guard
    /// keeps its mutex alive via the returned `Arc`, but a later `for_id`
    /// mints a fresh one, so forget only once the record is gone: the
    /// un-serialized window then covers paths that can only observe absence.
    fn forget(&self, id: &str) {
        self.inner.lock().remove(id);
    }
}

impl PasteService {
    pub fn new(store: Arc<dyn PasteStore>) -> Self {
        Self {
            store,
            locks: IdLocks::default(),
        }
    }

    /// Validate a submission and persist it under a fresh unique id.
    pub async fn create(&self, new: NewPaste) -> PasteResult<Paste> {
        if new.content.trim().is_empty() {
            return Err(PasteError::Validation("content must not be empty".into()));
        }

        let now = Utc::now();
        if let Some(expire_at) = new.expire_at {
            if expire_at <= now {
                return Err(PasteError::Validation(
                    "expiry must be strictly in the future".into(),
                ));
            }
        }

        let password = if new.is_password_protected {
            match new.password {
                Some(password) if !password.is_empty() => Some(password),
                _ => {
                    return Err(PasteError::Validation(
                        "a non-empty password is required for a protected paste".into(),
                    ));
                }
            }
        } else {
            // A password on an unprotected paste is ignored, not stored.
            None
        };

        let mut paste = Paste {
            id: String::new(),
            title: new
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.into()),
            content: new.content,
            language: new
                .language
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.into()),
            created_at: now,
            expire_at: new.expire_at,
            owner_id: new.owner_id,
            is_private: new.is_private,
            is_password_protected: new.is_password_protected,
            password,
            burn_after_read: new.burn_after_read,
            view_count: 0,
        };

        // Short ids collide with non-zero probability; check against the
        // store under the candidate id's lock and roll again on collision.
        loop {
            let id = generate_id(PASTE_ID_LEN);
            let lock = self.locks.for_id(&id);
            let _guard = lock.lock().await;
            if self.store.get(&id).await?.is_some() {
                continue;
            }
            paste.id = id;
            self.store.put(&paste).await?;
            debug!(id = %paste.id, burn = paste.burn_after_read, "created paste");
            return Ok(paste.sanitized());
        }
    }

    /// Fetch a paste for display without recording a view.
    ///
    /// Returns `NotFound` for unknown ids and for expired pastes, deleting the
    /// latter at discovery. The returned record never carries the password.
    pub async fn resolve(&self, id: &str) -> PasteResult<Paste> {
        let lock = self.locks.for_id(id);
        let _guard = lock.lock().await;
        let paste = self.fetch_live(id).await?;
        Ok(paste.sanitized())
    }

    /// Record one qualifying view: a display of content to a caller that has
    /// satisfied any password gate.
    ///
    /// The counter threshold is deliberate: a burn-after-read paste survives
    /// the view that sets `view_count` to 1 so the first render completes,
    /// and is deleted by the access that would push the count past 1.
    pub async fn record_qualifying_view(&self, id: &str) -> PasteResult<()> {
        let lock = self.locks.for_id(id);
        let _guard = lock.lock().await;
        let mut paste = self.fetch_live(id).await?;

        paste.view_count += 1;
        if paste.burn_after_read && paste.view_count > 1 {
            self.store.delete(id).await?;
            self.locks.forget(id);
            debug!(id, "burned paste after read");
        } else {
            self.store.put(&paste).await?;
        }
        Ok(())
    }

    /// Compare an attempt against the stored password.
    ///
    /// `false` for unprotected pastes and for any mismatch (exact,
    /// case-sensitive comparison); a wrong password is a normal outcome, not
    /// an error. Never mutates state. Expired pastes fail as `NotFound`.
    pub async fn verify_password(&self, id: &str, attempt: &str) -> PasteResult<bool> {
        let lock = self.locks.for_id(id);
        let _guard = lock.lock().await;
        let paste = self.fetch_live(id).await?;

        if !paste.is_password_protected {
            return Ok(false);
        }
        Ok(paste.password.as_deref() == Some(attempt))
    }

    /// Pastes attributed to `owner_id`, minus burn-after-read pastes (listing
    /// one would defeat the reveal-once intent) and minus expired ones, which
    /// are deleted as they are encountered.
    pub async fn list_for_owner(&self, owner_id: Uuid) -> PasteResult<Vec<Paste>> {
        let pastes = self.store.list_by_owner(owner_id).await?;
        self.filter_listable(pastes).await
    }

    /// Non-private pastes visible on the public index, with the same burn and
    /// expiry filtering as the owner listing.
    pub async fn list_public(&self) -> PasteResult<Vec<Paste>> {
        let pastes = self.store.list_public().await?;
        self.filter_listable(pastes).await
    }

    /// Unconditional removal; returns whether a record existed.
    pub async fn delete(&self, id: &str) -> PasteResult<bool> {
        let lock = self.locks.for_id(id);
        let _guard = lock.lock().await;
        let existed = self.store.delete(id).await?;
        self.locks.forget(id);
        if existed {
            debug!(id, "deleted paste");
        }
        Ok(existed)
    }

    /// Register a user identity record. The email must be unique.
    pub async fn register_user(&self, email: &str, name: &str) -> PasteResult<User> {
        let email = email.trim();
        let name = name.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(PasteError::Validation("a valid email is required".into()));
        }
        if name.is_empty() {
            return Err(PasteError::Validation("name must not be empty".into()));
        }

        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.store.put_user(&user).await?;
        debug!(user_id = %user.id, "registered user");
        Ok(user)
    }

    pub async fn get_user(&self, id: Uuid) -> PasteResult<Option<User>> {
        Ok(self.store.get_user(id).await?)
    }

    /// Store connectivity check for the readiness probe.
    pub async fn ping(&self) -> PasteResult<()> {
        Ok(self.store.ping().await?)
    }

    /// Raw fetch plus lazy expiry. The caller must hold the id's lock.
    async fn fetch_live(&self, id: &str) -> PasteResult<Paste> {
        let Some(paste) = self.store.get(id).await? else {
            // No record to guard; drop any registry entry created by for_id.
            self.locks.forget(id);
            return Err(PasteError::NotFound);
        };
        if paste.is_expired(Utc::now()) {
            self.store.delete(id).await?;
            self.locks.forget(id);
            debug!(id, "removed expired paste on read");
            return Err(PasteError::NotFound);
        }
        Ok(paste)
    }

    async fn filter_listable(&self, pastes: Vec<Paste>) -> PasteResult<Vec<Paste>> {
        let now = Utc::now();
        let mut visible = Vec::with_capacity(pastes.len());
        for paste in pastes {
            if paste.burn_after_read {
                continue;
            }
            if paste.is_expired(now) {
                self.discard_expired(&paste.id).await?;
                continue;
            }
            visible.push(paste.sanitized());
        }
        Ok(visible)
    }

    /// Delete an expired row found during a listing, re-checking under the
    /// id's lock in case a concurrent reader already removed it.
    async fn discard_expired(&self, id: &str) -> PasteResult<()> {
        let lock = self.locks.for_id(id);
        let _guard = lock.lock().await;
        match self.fetch_live(id).await {
            // Either still live (expiry raced with an update) or already gone.
            Ok(_) | Err(PasteError::NotFound) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

fn generate_id(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ID_CHARS[rng.random_range(0..ID_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::store::MemoryStore;
    use chrono::Duration;

    fn engine() -> (PasteService, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        (PasteService::new(store.clone()), store)
    }

    fn submission(content: &str) -> NewPaste {
        NewPaste {
            title: None,
            content: content.into(),
            language: None,
            expire_at: None,
            owner_id: None,
            is_private: false,
            is_password_protected: false,
            password: None,
            burn_after_read: false,
        }
    }

    /// Plant a record directly in the store, bypassing create-time validation.
    /// Needed for states `create` refuses to produce, like past-dated expiry.
    async fn plant(store: &MemoryStore, paste: &Paste) {
        store.put(paste).await.expect("plant paste");
    }

    fn raw_paste(id: &str) -> Paste {
        Paste {
            id: id.into(),
            title: DEFAULT_TITLE.into(),
            content: "planted".into(),
            language: DEFAULT_LANGUAGE.into(),
            created_at: Utc::now(),
            expire_at: None,
            owner_id: None,
            is_private: false,
            is_password_protected: false,
            password: None,
            burn_after_read: false,
            view_count: 0,
        }
    }

    #[tokio::test]
    async fn create_then_resolve_round_trips() {
        let (engine, _) = engine();
        let mut new = submission("fn main() {}");
        new.title = Some("  Hello World  ".into());
        new.language = Some("rust".into());

        let created = engine.create(new).await.expect("create");
        assert_eq!(created.id.len(), PASTE_ID_LEN);
        assert_eq!(created.title, "Hello World");
        assert_eq!(created.view_count, 0);

        let resolved = engine.resolve(&created.id).await.expect("resolve");
        assert_eq!(resolved.content, "fn main() {}");
        assert_eq!(resolved.language, "rust");
        assert_eq!(resolved.view_count, 0);
    }

    #[tokio::test]
    async fn create_applies_defaults() {
        let (engine, _) = engine();
        let created = engine.create(submission("x")).await.expect("create");
        assert_eq!(created.title, DEFAULT_TITLE);
        assert_eq!(created.language, DEFAULT_LANGUAGE);
        assert!(created.expire_at.is_none());
    }

    #[tokio::test]
    async fn create_rejects_blank_content() {
        let (engine, _) = engine();
        for content in ["", "   ", " \n\t "] {
            let err = engine
                .create(submission(content))
                .await
                .expect_err("blank content");
            assert!(matches!(err, PasteError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn create_rejects_past_expiry() {
        let (engine, _) = engine();
        let mut new = submission("y");
        new.expire_at = Some(Utc::now() - Duration::seconds(1));
        let err = engine.create(new).await.expect_err("past expiry");
        assert!(matches!(err, PasteError::Validation(_)));
    }

    #[tokio::test]
    async fn create_requires_password_when_protected() {
        let (engine, _) = engine();
        for password in [None, Some(String::new())] {
            let mut new = submission("z");
            new.is_password_protected = true;
            new.password = password;
            let err = engine.create(new).await.expect_err("missing password");
            assert!(matches!(err, PasteError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn create_ignores_password_when_unprotected() {
        let (engine, store) = engine();
        let mut new = submission("open");
        new.password = Some("ignored".into());
        let created = engine.create(new).await.expect("create");

        let stored = store.get(&created.id).await.expect("get").expect("present");
        assert!(stored.password.is_none());
        assert!(!engine
            .verify_password(&created.id, "ignored")
            .await
            .expect("verify"));
    }

    #[tokio::test]
    async fn expired_paste_is_absent_and_stays_absent() {
        let (engine, store) = engine();
        let mut paste = raw_paste("expired1");
        paste.expire_at = Some(Utc::now() - Duration::seconds(1));
        plant(&store, &paste).await;

        assert!(matches!(
            engine.resolve("expired1").await,
            Err(PasteError::NotFound)
        ));
        // The discovering read deleted the row.
        assert!(store.get("expired1").await.expect("get").is_none());
        // Idempotent absence.
        assert!(matches!(
            engine.resolve("expired1").await,
            Err(PasteError::NotFound)
        ));
    }

    #[tokio::test]
    async fn burn_after_read_consumes_on_second_view() {
        let (engine, store) = engine();
        let mut new = submission("x");
        new.burn_after_read = true;
        let created = engine.create(new).await.expect("create");
        let id = created.id.clone();

        // Resolve alone never consumes.
        assert_eq!(engine.resolve(&id).await.expect("resolve").view_count, 0);

        engine.record_qualifying_view(&id).await.expect("first view");
        let after_first = engine.resolve(&id).await.expect("still readable");
        assert_eq!(after_first.view_count, 1);
        assert_eq!(after_first.content, "x");

        engine
            .record_qualifying_view(&id)
            .await
            .expect("second view burns");
        assert!(matches!(
            engine.resolve(&id).await,
            Err(PasteError::NotFound)
        ));
        assert!(store.get(&id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn view_count_grows_freely_without_burn() {
        let (engine, _) = engine();
        let created = engine.create(submission("counted")).await.expect("create");
        for _ in 0..3 {
            engine
                .record_qualifying_view(&created.id)
                .await
                .expect("view");
        }
        let resolved = engine.resolve(&created.id).await.expect("resolve");
        assert_eq!(resolved.view_count, 3);
    }

    #[tokio::test]
    async fn record_view_on_unknown_id_is_not_found() {
        let (engine, _) = engine();
        assert!(matches!(
            engine.record_qualifying_view("missing1").await,
            Err(PasteError::NotFound)
        ));
    }

    #[tokio::test]
    async fn verify_password_is_exact_and_never_mutates() {
        let (engine, _) = engine();
        let mut new = submission("z");
        new.is_password_protected = true;
        new.password = Some("s3cr3t".into());
        let created = engine.create(new).await.expect("create");
        let id = created.id.clone();

        assert!(!engine.verify_password(&id, "wrong").await.expect("verify"));
        assert!(!engine.verify_password(&id, "").await.expect("verify"));
        assert!(!engine.verify_password(&id, "S3CR3T").await.expect("verify"));
        assert!(engine.verify_password(&id, "s3cr3t").await.expect("verify"));

        let resolved = engine.resolve(&id).await.expect("resolve");
        assert_eq!(resolved.view_count, 0);
        assert!(resolved.password.is_none());
        assert!(resolved.is_password_protected);
    }

    #[tokio::test]
    async fn verify_password_is_false_for_unprotected_paste() {
        let (engine, _) = engine();
        let created = engine.create(submission("open")).await.expect("create");
        assert!(!engine
            .verify_password(&created.id, "anything")
            .await
            .expect("verify"));
    }

    #[tokio::test]
    async fn owner_listing_hides_burn_and_expired_pastes() {
        let (engine, store) = engine();
        let owner = Uuid::new_v4();

        let mut plain = submission("plain");
        plain.owner_id = Some(owner);
        let plain = engine.create(plain).await.expect("create plain");

        let mut burn = submission("burn");
        burn.owner_id = Some(owner);
        burn.burn_after_read = true;
        engine.create(burn).await.expect("create burn");

        let mut expired = raw_paste("expired2");
        expired.owner_id = Some(owner);
        expired.expire_at = Some(Utc::now() - Duration::seconds(1));
        plant(&store, &expired).await;

        let listed = engine.list_for_owner(owner).await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, plain.id);
        // Lazy expiry also fires on listings.
        assert!(store.get("expired2").await.expect("get").is_none());
    }

    #[tokio::test]
    async fn public_listing_hides_private_and_burn_pastes() {
        let (engine, _) = engine();
        let public = engine.create(submission("public")).await.expect("create");

        let mut private = submission("private");
        private.is_private = true;
        engine.create(private).await.expect("create private");

        let mut burn = submission("burn");
        burn.burn_after_read = true;
        engine.create(burn).await.expect("create burn");

        let listed = engine.list_public().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, public.id);
    }

    #[tokio::test]
    async fn delete_reports_whether_a_record_existed() {
        let (engine, _) = engine();
        let created = engine.create(submission("gone")).await.expect("create");
        assert!(engine.delete(&created.id).await.expect("delete"));
        assert!(!engine.delete(&created.id).await.expect("second delete"));
        assert!(matches!(
            engine.resolve(&created.id).await,
            Err(PasteError::NotFound)
        ));
    }

    #[tokio::test]
    async fn register_user_validates_and_rejects_duplicates() {
        let (engine, _) = engine();
        let user = engine
            .register_user(" demo@example.com ", " Demo User ")
            .await
            .expect("register");
        assert_eq!(user.email, "demo@example.com");
        assert_eq!(user.name, "Demo User");

        let err = engine
            .register_user("demo@example.com", "Other")
            .await
            .expect_err("duplicate email");
        assert!(matches!(
            err,
            PasteError::Store(StoreError::DuplicateEmail(_))
        ));

        for (email, name) in [("", "Name"), ("not-an-email", "Name"), ("a@b.c", "  ")] {
            let err = engine
                .register_user(email, name)
                .await
                .expect_err("invalid registration");
            assert!(matches!(err, PasteError::Validation(_)));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_views_cannot_revive_a_burned_paste() {
        let (engine, store) = engine();
        let mut new = submission("race");
        new.burn_after_read = true;
        let created = engine.create(new).await.expect("create");
        let id = created.id.clone();

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            let id = id.clone();
            tasks.push(tokio::spawn(async move {
                // Later callers see NotFound once the paste is consumed.
                let _ = engine.record_qualifying_view(&id).await;
            }));
        }
        for task in tasks {
            task.await.expect("join view task");
        }

        assert!(matches!(
            engine.resolve(&id).await,
            Err(PasteError::NotFound)
        ));
        assert!(store.get(&id).await.expect("get").is_none());
    }
}
