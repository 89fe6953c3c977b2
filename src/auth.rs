//! Bearer-token sessions. Tokens live in process memory, not in the store:
//! the transport resolves a token to a user id and passes that id into
//! service calls, so the services never read ambient session state.

use std::collections::HashMap;
use std::sync::Mutex;

use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{Duration, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::config::token_expiration_hours;
use crate::core::errors::ServiceError;
use crate::identity;
use crate::models::models::TokenData;
use crate::users::user_view;
use crate::AppState;

pub struct Sessions {
    tokens: Mutex<HashMap<String, TokenData>>,
}

impl Sessions {
    pub fn new() -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
        }
    }

    pub fn issue(&self, user_id: u64) -> String {
        let token = Uuid::new_v4().to_string();
        self.tokens.lock().expect("session lock poisoned").insert(
            token.clone(),
            TokenData {
                user_id,
                created_at: Utc::now(),
            },
        );
        token
    }

    pub fn revoke(&self, token: &str) {
        self.tokens
            .lock()
            .expect("session lock poisoned")
            .remove(token);
    }

    /// Resolve a token to its user id. Expired tokens are dropped on sight.
    pub fn resolve(&self, token: &str) -> Option<u64> {
        let mut tokens = self.tokens.lock().expect("session lock poisoned");
        let (user_id, created_at) = {
            let data = tokens.get(token)?;
            (data.user_id, data.created_at)
        };
        if Utc::now() - created_at > Duration::hours(token_expiration_hours()) {
            tokens.remove(token);
            return None;
        }
        Some(user_id)
    }
}

impl Default for Sessions {
    fn default() -> Self {
        Self::new()
    }
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Authenticated user id for a request, if the token is valid, unexpired and
/// the user still exists.
pub fn validate_token(req: &HttpRequest, state: &AppState) -> Option<u64> {
    let token = bearer_token(req)?;
    let user_id = state.sessions.resolve(token)?;
    match state.store.find_user(user_id) {
        Ok(Some(_)) => Some(user_id),
        _ => None,
    }
}

pub fn require_user(req: &HttpRequest, state: &AppState) -> Result<u64, ServiceError> {
    validate_token(req, state).ok_or(ServiceError::Unauthorized)
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login_user(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user = identity::authenticate(state.store.as_ref(), &body.username, &body.password)?;
    let token = state.sessions.issue(user.id);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "token": token,
        "user": user_view(&user),
    })))
}

pub async fn logout_user(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let token = bearer_token(&req).ok_or(ServiceError::Unauthorized)?;
    state.sessions.revoke(token);
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Logged out successfully"
    })))
}
