use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::models::models::{Document, NewPost, NewUser, Post, User};
use crate::store::{Store, StoreError, StoreResult};

/// Flat-document store: the whole state lives in one JSON file.
///
/// The document is mirrored in memory behind a `Mutex` and flushed to disk on
/// every mutation, so a mutation observes the latest state, applies its
/// change, and persists before the next writer runs. Opening a path with no
/// file initializes and persists an empty document; an unreadable or
/// malformed file is an error.
pub struct JsonStore {
    path: PathBuf,
    doc: Mutex<Document>,
}

impl JsonStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let doc = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let doc = Document::default();
                write_atomic(&path, &doc)?;
                doc
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        Ok(Self {
            path,
            doc: Mutex::new(doc),
        })
    }

    /// Single mutation boundary: lock, apply to a working copy, flush, then
    /// commit the copy to memory. A failed apply or flush leaves both the
    /// file and the in-memory document untouched.
    fn mutate<T>(&self, apply: impl FnOnce(&mut Document) -> StoreResult<T>) -> StoreResult<T> {
        let mut doc = self.doc.lock().expect("store lock poisoned");
        let mut working = doc.clone();
        let out = apply(&mut working)?;
        write_atomic(&self.path, &working)?;
        *doc = working;
        Ok(out)
    }
}

/// Write via a temp file in the same directory, then rename over the target,
/// so the target is never partially written.
fn write_atomic(path: &Path, doc: &Document) -> StoreResult<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, serde_json::to_vec_pretty(doc)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

impl Store for JsonStore {
    fn load(&self) -> StoreResult<Document> {
        Ok(self.doc.lock().expect("store lock poisoned").clone())
    }

    fn save(&self, doc: &Document) -> StoreResult<()> {
        self.mutate(|d| {
            *d = doc.clone();
            Ok(())
        })
    }

    fn find_user(&self, id: u64) -> StoreResult<Option<User>> {
        let doc = self.doc.lock().expect("store lock poisoned");
        Ok(doc.users.iter().find(|u| u.id == id).cloned())
    }

    fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let doc = self.doc.lock().expect("store lock poisoned");
        Ok(doc.users.iter().find(|u| u.username == username).cloned())
    }

    fn insert_user(&self, new_user: NewUser) -> StoreResult<User> {
        self.mutate(|doc| {
            if doc.users.iter().any(|u| u.username == new_user.username) {
                return Err(StoreError::UsernameExists(new_user.username.clone()));
            }
            doc.last_user_id += 1;
            let user = User {
                id: doc.last_user_id,
                username: new_user.username,
                password_hash: new_user.password_hash,
                display_name: new_user.display_name,
                avatar: new_user.avatar,
                registered_at: new_user.registered_at,
            };
            doc.users.push(user.clone());
            Ok(user)
        })
    }

    fn insert_post(&self, new_post: NewPost) -> StoreResult<Post> {
        self.mutate(|doc| {
            doc.last_post_id += 1;
            let post = Post {
                id: doc.last_post_id,
                author_id: new_post.author_id,
                author: new_post.author,
                avatar: new_post.avatar,
                content: new_post.content,
                created_at: new_post.created_at,
                likes: 0,
                comments: 0,
                liked_by: Vec::new(),
            };
            doc.posts.push(post.clone());
            Ok(post)
        })
    }

    fn toggle_like(&self, post_id: u64, user_id: u64) -> StoreResult<Option<u64>> {
        self.mutate(|doc| {
            let Some(post) = doc.posts.iter_mut().find(|p| p.id == post_id) else {
                return Ok(None);
            };
            match post.liked_by.iter().position(|id| *id == user_id) {
                Some(idx) => {
                    post.liked_by.remove(idx);
                }
                None => post.liked_by.push(user_id),
            }
            post.likes = post.liked_by.len() as u64;
            Ok(Some(post.likes))
        })
    }
}
