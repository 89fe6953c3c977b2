//! Persistent state behind a single `Store` interface.
//!
//! Two interchangeable backends implement it: a flat JSON document on disk
//! ([`json::JsonStore`]) and a small SQLite schema ([`sqlite::SqliteStore`]).
//! Which one runs is a configuration choice; everything above the trait is
//! backend-agnostic.

pub mod json;
pub mod sqlite;

use std::path::Path;
use std::sync::Arc;

use crate::config::StorageKind;
use crate::models::models::{Document, NewPost, NewUser, Post, User};

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing medium exists but cannot be decoded.
    #[error("corrupt store: {0}")]
    Corrupt(String),

    #[error("username already exists: {0}")]
    UsernameExists(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent store for users and posts.
///
/// All implementations must satisfy these invariants:
/// - User ids and usernames are unique; post ids are unique and strictly
///   increasing, assigned from a persisted counter that never runs backwards
///   (ids are not reused).
/// - A post's like count always equals the size of its `liked_by` set, and a
///   user appears in `liked_by` at most once.
/// - Every mutation is atomic with respect to concurrent callers: two
///   interleaved writers cannot lose each other's update or hand out the same
///   id twice.
pub trait Store: Send + Sync {
    /// Read the entire persisted state.
    fn load(&self) -> StoreResult<Document>;

    /// Overwrite the entire persisted state, counters included.
    ///
    /// Atomic with respect to a single caller: an interrupted save never
    /// leaves a partially written document behind. This is also the
    /// primitive for moving data between backends.
    fn save(&self, doc: &Document) -> StoreResult<()>;

    fn find_user(&self, id: u64) -> StoreResult<Option<User>>;

    /// Exact, case-sensitive username lookup.
    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Insert a user, assigning the next user id.
    ///
    /// Username uniqueness is enforced inside the mutation boundary; a
    /// duplicate fails with [`StoreError::UsernameExists`] even when two
    /// registrations race.
    fn insert_user(&self, new_user: NewUser) -> StoreResult<User>;

    /// Insert a post, assigning the next post id from the persisted counter.
    /// The post starts with no likes and a zero comment counter.
    fn insert_post(&self, new_post: NewPost) -> StoreResult<Post>;

    /// Strict like toggle: membership of `user_id` in the post's `liked_by`
    /// set is negated, and the like count follows. Returns the new like
    /// count, or `Ok(None)` if the post does not exist.
    fn toggle_like(&self, post_id: u64, user_id: u64) -> StoreResult<Option<u64>>;
}

/// Open the configured backend.
pub fn open(kind: StorageKind, path: &Path) -> StoreResult<Arc<dyn Store>> {
    match kind {
        StorageKind::Json => Ok(Arc::new(json::JsonStore::open(path)?)),
        StorageKind::Sqlite => Ok(Arc::new(sqlite::SqliteStore::open(path)?)),
    }
}
