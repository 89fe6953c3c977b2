use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub avatar: String,
    pub registered_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Post {
    pub id: u64,
    pub author_id: u64,
    pub author: String,
    pub avatar: String,
    pub content: String,
    #[serde(rename = "date")]
    pub created_at: DateTime<Utc>,
    pub likes: u64,
    pub comments: u64,
    pub liked_by: Vec<u64>,
}

/// The full persisted state under the flat-document backend. The counters are
/// monotonic and independent of the entity lists, so ids are never reused.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub users: Vec<User>,
    pub posts: Vec<Post>,
    pub last_user_id: u64,
    pub last_post_id: u64,
    pub last_comment_id: u64,
}

/// A user about to be inserted; the store assigns the id.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub display_name: String,
    pub avatar: String,
    pub registered_at: DateTime<Utc>,
}

/// A post about to be inserted; the store assigns the id and the like state.
#[derive(Clone, Debug)]
pub struct NewPost {
    pub author_id: u64,
    pub author: String,
    pub avatar: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

pub struct TokenData {
    pub user_id: u64,
    pub created_at: DateTime<Utc>,
}
