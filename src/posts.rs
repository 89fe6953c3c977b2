use std::sync::OnceLock;

use actix_web::{web, HttpRequest, HttpResponse};
use ammonia::Builder;
use html_escape::encode_double_quoted_attribute;
use regex::Regex;
use serde::Deserialize;

use crate::auth::require_user;
use crate::core::errors::ServiceError;
use crate::feed;
use crate::AppState;

#[derive(Deserialize)]
pub struct PostRequest {
    pub content: String,
}

pub async fn create_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<PostRequest>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = require_user(&req, &state)?;
    let content = filter_post_content(&body.content);
    let post = feed::create_post(state.store.as_ref(), user_id, &content)?;
    Ok(HttpResponse::Created().json(post))
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub filter: Option<String>,
}

/// Full feed by default; `?filter=mine` / `?filter=others` partitions it
/// around the authenticated viewer.
pub async fn list_posts(
    req: HttpRequest,
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ServiceError> {
    let posts = feed::list_posts(state.store.as_ref())?;
    let posts = match query.filter.as_deref() {
        None => posts,
        Some("mine") => {
            let viewer = require_user(&req, &state)?;
            feed::partition_posts(posts, viewer).0
        }
        Some("others") => {
            let viewer = require_user(&req, &state)?;
            feed::partition_posts(posts, viewer).1
        }
        Some(other) => {
            return Err(ServiceError::Validation(format!("unknown filter: {other}")));
        }
    };
    Ok(HttpResponse::Ok().json(serde_json::json!({ "posts": posts })))
}

pub async fn toggle_like(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> Result<HttpResponse, ServiceError> {
    let user_id = require_user(&req, &state)?;
    let likes = feed::toggle_like(state.store.as_ref(), path.into_inner(), user_id)?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "likes": likes })))
}

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("Regex should compile"))
}

/// Sanitize HTML to remove dangerous scripts and event handlers, then turn
/// bare HTTP/HTTPS URLs into clickable links with proper escaping.
fn filter_post_content(content: &str) -> String {
    let clean = Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(content)
        .to_string();

    url_regex()
        .replace_all(&clean, |caps: &regex::Captures| {
            let url = &caps[0];
            let escaped_url = encode_double_quoted_attribute(url);
            format!(r#"<a href="{}" target="_blank">{}</a>"#, escaped_url, url)
        })
        .to_string()
}
