use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth::require_user;
use crate::core::errors::ServiceError;
use crate::identity;
use crate::models::models::User;
use crate::AppState;

/// JSON shape for a user in API responses. The password hash stays in the
/// store.
pub fn user_view(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "username": user.username,
        "name": user.display_name,
        "avatar": user.avatar,
        "registered_at": user.registered_at,
    })
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub name: Option<String>,
}

pub async fn create_user(
    state: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user = identity::register(
        state.store.as_ref(),
        &body.username,
        &body.password,
        body.name.as_deref(),
    )?;
    Ok(HttpResponse::Created().json(user_view(&user)))
}

pub async fn get_profile(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = require_user(&req, &state)?;
    let user = state
        .store
        .find_user(user_id)?
        .ok_or(ServiceError::Unauthorized)?;
    Ok(HttpResponse::Ok().json(user_view(&user)))
}
