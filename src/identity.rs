//! Registration and authentication. Stateless: every call goes to the store,
//! and the caller owns whatever session it establishes afterwards.

use chrono::Utc;

use crate::config::{MAX_USERNAME_LENGTH, MIN_PASSWORD_LENGTH, MIN_USERNAME_LENGTH};
use crate::core::errors::ServiceError;
use crate::core::helpers::{hash_password, verify_password};
use crate::models::models::{NewUser, User};
use crate::store::Store;

pub fn register(
    store: &dyn Store,
    username: &str,
    password: &str,
    display_name: Option<&str>,
) -> Result<User, ServiceError> {
    let username_len = username.chars().count();
    if username_len < MIN_USERNAME_LENGTH || username_len > MAX_USERNAME_LENGTH {
        return Err(ServiceError::Validation(format!(
            "username must be {MIN_USERNAME_LENGTH}-{MAX_USERNAME_LENGTH} characters"
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ServiceError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    let display_name = display_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(username)
        .to_string();
    let password_hash =
        hash_password(password).map_err(|e| ServiceError::Internal(e.to_string()))?;

    // The store enforces username uniqueness inside its mutation boundary;
    // a duplicate surfaces here as UsernameTaken.
    let user = store.insert_user(NewUser {
        username: username.to_string(),
        password_hash,
        display_name,
        avatar: avatar_initial(username),
        registered_at: Utc::now(),
    })?;
    Ok(user)
}

pub fn authenticate(
    store: &dyn Store,
    username: &str,
    password: &str,
) -> Result<User, ServiceError> {
    let user = store
        .find_user_by_username(username)?
        .ok_or(ServiceError::InvalidCredentials)?;
    if !verify_password(password, &user.password_hash) {
        return Err(ServiceError::InvalidCredentials);
    }
    Ok(user)
}

/// Uppercase first character of the username.
fn avatar_initial(username: &str) -> String {
    username
        .chars()
        .next()
        .map(|c| c.to_uppercase().to_string())
        .unwrap_or_default()
}
