use chrono::Utc;

use crate::core::helpers::hash_password;
use crate::models::models::{NewPost, NewUser};
use crate::store::Store;

/// Seed the store with an admin account and a welcome post on first startup.
/// Idempotent: a store that already has the admin user is left alone.
pub fn init_demo_data(store: &dyn Store) -> anyhow::Result<()> {
    if store.find_user_by_username("admin")?.is_some() {
        return Ok(());
    }

    let admin = store.insert_user(NewUser {
        username: "admin".to_string(),
        password_hash: hash_password("admin123")?,
        display_name: "Admin".to_string(),
        avatar: "A".to_string(),
        registered_at: Utc::now(),
    })?;

    store.insert_post(NewPost {
        author_id: admin.id,
        author: admin.display_name.clone(),
        avatar: admin.avatar.clone(),
        content: "Welcome to Texts!".to_string(),
        created_at: Utc::now(),
    })?;

    Ok(())
}
