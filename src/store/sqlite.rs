use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::models::{Document, NewPost, NewUser, Post, User};
use crate::store::{Store, StoreError, StoreResult};

/// Relational store: users, posts and a `likes` join table in SQLite.
///
/// The connection sits behind a `Mutex`, so mutations are serialized; multi-
/// statement mutations additionally run in a transaction. `AUTOINCREMENT`
/// keeps both id sequences monotonic and never reuses an id. The primary key
/// on `likes(post_id, user_id)` enforces the at-most-one-like-per-user
/// invariant at the schema level.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    display_name TEXT NOT NULL,
    avatar TEXT NOT NULL,
    registered_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    author_id INTEGER NOT NULL,
    author TEXT NOT NULL,
    avatar TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL,
    comments INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (author_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS likes (
    post_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    PRIMARY KEY (post_id, user_id),
    FOREIGN KEY (post_id) REFERENCES posts(id),
    FOREIGN KEY (user_id) REFERENCES users(id)
);
"#;

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// In-memory database for tests.
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn parse_timestamp(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Corrupt(format!("bad timestamp {raw:?}: {e}")))
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<(i64, String, String, String, String, String)> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
    ))
}

fn into_user(row: (i64, String, String, String, String, String)) -> StoreResult<User> {
    Ok(User {
        id: row.0 as u64,
        username: row.1,
        password_hash: row.2,
        display_name: row.3,
        avatar: row.4,
        registered_at: parse_timestamp(&row.5)?,
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Read the persisted id counter for a table. Present only once the table
/// has seen an insert.
fn sequence_value(conn: &Connection, table: &str) -> StoreResult<u64> {
    let seq: Option<i64> = conn
        .query_row(
            "SELECT seq FROM sqlite_sequence WHERE name = ?1",
            params![table],
            |row| row.get(0),
        )
        .optional()?;
    Ok(seq.unwrap_or(0) as u64)
}

fn liked_by(conn: &Connection, post_id: i64) -> StoreResult<Vec<u64>> {
    let mut stmt = conn.prepare("SELECT user_id FROM likes WHERE post_id = ?1 ORDER BY user_id")?;
    let ids = stmt
        .query_map(params![post_id], |row| row.get::<_, i64>(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids.into_iter().map(|id| id as u64).collect())
}

impl Store for SqliteStore {
    fn load(&self) -> StoreResult<Document> {
        let conn = self.conn.lock().expect("store lock poisoned");

        let mut stmt = conn.prepare(
            "SELECT id, username, password_hash, display_name, avatar, registered_at
             FROM users ORDER BY id",
        )?;
        let users = stmt
            .query_map([], user_from_row)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(into_user)
            .collect::<StoreResult<Vec<User>>>()?;

        let mut stmt = conn.prepare(
            "SELECT id, author_id, author, avatar, content, created_at, comments
             FROM posts ORDER BY id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, i64>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut posts = Vec::with_capacity(rows.len());
        for (id, author_id, author, avatar, content, created_at, comments) in rows {
            let liked_by = liked_by(&conn, id)?;
            posts.push(Post {
                id: id as u64,
                author_id: author_id as u64,
                author,
                avatar,
                content,
                created_at: parse_timestamp(&created_at)?,
                likes: liked_by.len() as u64,
                comments: comments as u64,
                liked_by,
            });
        }

        Ok(Document {
            users,
            posts,
            last_user_id: sequence_value(&conn, "users")?,
            last_post_id: sequence_value(&conn, "posts")?,
            last_comment_id: 0,
        })
    }

    fn save(&self, doc: &Document) -> StoreResult<()> {
        let mut conn = self.conn.lock().expect("store lock poisoned");
        let tx = conn.transaction()?;

        tx.execute_batch("DELETE FROM likes; DELETE FROM posts; DELETE FROM users;")?;
        for user in &doc.users {
            tx.execute(
                "INSERT INTO users (id, username, password_hash, display_name, avatar, registered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    user.id as i64,
                    user.username,
                    user.password_hash,
                    user.display_name,
                    user.avatar,
                    user.registered_at.to_rfc3339(),
                ],
            )?;
        }
        for post in &doc.posts {
            tx.execute(
                "INSERT INTO posts (id, author_id, author, avatar, content, created_at, comments)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    post.id as i64,
                    post.author_id as i64,
                    post.author,
                    post.avatar,
                    post.content,
                    post.created_at.to_rfc3339(),
                    post.comments as i64,
                ],
            )?;
            for user_id in &post.liked_by {
                tx.execute(
                    "INSERT INTO likes (post_id, user_id) VALUES (?1, ?2)",
                    params![post.id as i64, *user_id as i64],
                )?;
            }
        }
        // Keep the id sequences at least as high as the document's counters
        // so future inserts never reuse an id.
        for (table, seq) in [("users", doc.last_user_id), ("posts", doc.last_post_id)] {
            tx.execute(
                "INSERT OR REPLACE INTO sqlite_sequence (name, seq) VALUES (?1, ?2)",
                params![table, seq as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn find_user(&self, id: u64) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let row = conn
            .query_row(
                "SELECT id, username, password_hash, display_name, avatar, registered_at
                 FROM users WHERE id = ?1",
                params![id as i64],
                user_from_row,
            )
            .optional()?;
        row.map(into_user).transpose()
    }

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let row = conn
            .query_row(
                "SELECT id, username, password_hash, display_name, avatar, registered_at
                 FROM users WHERE username = ?1",
                params![username],
                user_from_row,
            )
            .optional()?;
        row.map(into_user).transpose()
    }

    fn insert_user(&self, new_user: NewUser) -> StoreResult<User> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let result = conn.execute(
            "INSERT INTO users (username, password_hash, display_name, avatar, registered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new_user.username,
                new_user.password_hash,
                new_user.display_name,
                new_user.avatar,
                new_user.registered_at.to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(StoreError::UsernameExists(new_user.username));
            }
            Err(e) => return Err(e.into()),
        }
        Ok(User {
            id: conn.last_insert_rowid() as u64,
            username: new_user.username,
            password_hash: new_user.password_hash,
            display_name: new_user.display_name,
            avatar: new_user.avatar,
            registered_at: new_user.registered_at,
        })
    }

    fn insert_post(&self, new_post: NewPost) -> StoreResult<Post> {
        let conn = self.conn.lock().expect("store lock poisoned");
        conn.execute(
            "INSERT INTO posts (author_id, author, avatar, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                new_post.author_id as i64,
                new_post.author,
                new_post.avatar,
                new_post.content,
                new_post.created_at.to_rfc3339(),
            ],
        )?;
        Ok(Post {
            id: conn.last_insert_rowid() as u64,
            author_id: new_post.author_id,
            author: new_post.author,
            avatar: new_post.avatar,
            content: new_post.content,
            created_at: new_post.created_at,
            likes: 0,
            comments: 0,
            liked_by: Vec::new(),
        })
    }

    fn toggle_like(&self, post_id: u64, user_id: u64) -> StoreResult<Option<u64>> {
        let mut conn = self.conn.lock().expect("store lock poisoned");
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM posts WHERE id = ?1",
                params![post_id as i64],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(None);
        }

        let liked: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM likes WHERE post_id = ?1 AND user_id = ?2",
                params![post_id as i64, user_id as i64],
                |row| row.get(0),
            )
            .optional()?;
        if liked.is_some() {
            tx.execute(
                "DELETE FROM likes WHERE post_id = ?1 AND user_id = ?2",
                params![post_id as i64, user_id as i64],
            )?;
        } else {
            tx.execute(
                "INSERT INTO likes (post_id, user_id) VALUES (?1, ?2)",
                params![post_id as i64, user_id as i64],
            )?;
        }

        let count: i64 = tx.query_row(
            "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
            params![post_id as i64],
            |row| row.get(0),
        )?;
        tx.commit()?;
        Ok(Some(count as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_hash: "$argon2id$fake".to_string(),
            display_name: username.to_string(),
            avatar: username[..1].to_uppercase(),
            registered_at: Utc::now(),
        }
    }

    fn new_post(author: &User, content: &str) -> NewPost {
        NewPost {
            author_id: author.id,
            author: author.display_name.clone(),
            avatar: author.avatar.clone(),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    // -----------------------------------------------------------------------
    // Users
    // -----------------------------------------------------------------------

    #[test]
    fn insert_and_find_user() {
        let store = SqliteStore::in_memory().unwrap();
        let alice = store.insert_user(new_user("alice")).unwrap();
        assert_eq!(alice.id, 1);

        let by_id = store.find_user(alice.id).unwrap().unwrap();
        assert_eq!(by_id, alice);
        let by_name = store.find_user_by_username("alice").unwrap().unwrap();
        assert_eq!(by_name, alice);
    }

    #[test]
    fn duplicate_username_hits_unique_constraint() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert_user(new_user("alice")).unwrap();
        match store.insert_user(new_user("alice")) {
            Err(StoreError::UsernameExists(name)) => assert_eq!(name, "alice"),
            other => panic!("expected UsernameExists, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn username_lookup_is_case_sensitive() {
        let store = SqliteStore::in_memory().unwrap();
        store.insert_user(new_user("Alice")).unwrap();
        assert!(store.find_user_by_username("Alice").unwrap().is_some());
        assert!(store.find_user_by_username("alice").unwrap().is_none());
    }

    // -----------------------------------------------------------------------
    // Posts and likes
    // -----------------------------------------------------------------------

    #[test]
    fn post_ids_are_strictly_increasing() {
        let store = SqliteStore::in_memory().unwrap();
        let alice = store.insert_user(new_user("alice")).unwrap();

        let a = store.insert_post(new_post(&alice, "one")).unwrap();
        let b = store.insert_post(new_post(&alice, "two")).unwrap();
        assert!(a.id < b.id);
    }

    #[test]
    fn toggle_like_is_a_strict_toggle() {
        let store = SqliteStore::in_memory().unwrap();
        let alice = store.insert_user(new_user("alice")).unwrap();
        let bob = store.insert_user(new_user("bob")).unwrap();
        let post = store.insert_post(new_post(&alice, "hello")).unwrap();

        assert_eq!(store.toggle_like(post.id, alice.id).unwrap(), Some(1));
        assert_eq!(store.toggle_like(post.id, bob.id).unwrap(), Some(2));
        assert_eq!(store.toggle_like(post.id, alice.id).unwrap(), Some(1));
        assert_eq!(store.toggle_like(post.id, bob.id).unwrap(), Some(0));
    }

    #[test]
    fn toggle_like_on_missing_post_returns_none() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.toggle_like(7, 1).unwrap(), None);
    }

    #[test]
    fn load_reconstructs_liked_by_and_counts() {
        let store = SqliteStore::in_memory().unwrap();
        let alice = store.insert_user(new_user("alice")).unwrap();
        let bob = store.insert_user(new_user("bob")).unwrap();
        let post = store.insert_post(new_post(&alice, "hello")).unwrap();
        store.toggle_like(post.id, alice.id).unwrap();
        store.toggle_like(post.id, bob.id).unwrap();

        let doc = store.load().unwrap();
        let p = doc.posts.iter().find(|p| p.id == post.id).unwrap();
        assert_eq!(p.likes, 2);
        assert_eq!(p.liked_by, vec![alice.id, bob.id]);
        assert_eq!(doc.last_user_id, 2);
        assert_eq!(doc.last_post_id, 1);
    }

    // -----------------------------------------------------------------------
    // Save / cross-backend migration
    // -----------------------------------------------------------------------

    #[test]
    fn save_replaces_all_rows() {
        let store = SqliteStore::in_memory().unwrap();
        let alice = store.insert_user(new_user("alice")).unwrap();
        let post = store.insert_post(new_post(&alice, "hello")).unwrap();
        store.toggle_like(post.id, alice.id).unwrap();

        let doc = store.load().unwrap();
        let other = SqliteStore::in_memory().unwrap();
        other.save(&doc).unwrap();

        assert_eq!(other.load().unwrap(), doc);
    }

    #[test]
    fn save_keeps_id_sequences_fresh() {
        let store = SqliteStore::in_memory().unwrap();
        let alice = store.insert_user(new_user("alice")).unwrap();
        store.insert_post(new_post(&alice, "one")).unwrap();
        store.insert_post(new_post(&alice, "two")).unwrap();

        let mut doc = store.load().unwrap();
        doc.posts.clear();
        store.save(&doc).unwrap();

        let next = store.insert_post(new_post(&alice, "three")).unwrap();
        assert_eq!(next.id, 3);
    }
}
