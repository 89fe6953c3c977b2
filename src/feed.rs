//! Post creation, listing and like toggling. Every operation reloads from the
//! store and persists through it; nothing is cached between calls.

use chrono::Utc;

use crate::config::MAX_POST_LENGTH;
use crate::core::errors::ServiceError;
use crate::models::models::{NewPost, Post};
use crate::store::Store;

pub fn create_post(store: &dyn Store, author_id: u64, content: &str) -> Result<Post, ServiceError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ServiceError::Validation(
            "content must not be empty".to_string(),
        ));
    }
    if content.chars().count() > MAX_POST_LENGTH {
        return Err(ServiceError::Validation(format!(
            "content must be at most {MAX_POST_LENGTH} characters"
        )));
    }

    let author = store
        .find_user(author_id)?
        .ok_or(ServiceError::AuthorNotFound)?;
    let post = store.insert_post(NewPost {
        author_id: author.id,
        author: author.display_name.clone(),
        avatar: author.avatar.clone(),
        content: content.to_string(),
        created_at: Utc::now(),
    })?;
    Ok(post)
}

/// All posts, newest first; posts sharing a timestamp order by descending id.
pub fn list_posts(store: &dyn Store) -> Result<Vec<Post>, ServiceError> {
    let mut posts = store.load()?.posts;
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    Ok(posts)
}

/// Split a post list into the viewer's own posts and everyone else's,
/// preserving order.
pub fn partition_posts(posts: Vec<Post>, viewer_id: u64) -> (Vec<Post>, Vec<Post>) {
    posts.into_iter().partition(|p| p.author_id == viewer_id)
}

pub fn toggle_like(store: &dyn Store, post_id: u64, user_id: u64) -> Result<u64, ServiceError> {
    store
        .toggle_like(post_id, user_id)?
        .ok_or(ServiceError::PostNotFound)
}
