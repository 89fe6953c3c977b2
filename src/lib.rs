//! texts — a small social-posting backend: register, login, post, like.
//!
//! State lives behind the [`store::Store`] trait with two backends (flat JSON
//! document or SQLite), selected by configuration. [`identity`] and [`feed`]
//! implement the service layer; the actix-web handlers in [`auth`], [`users`]
//! and [`posts`] are the transport.

use std::sync::Arc;

use actix_web::web;

pub mod auth;
pub mod config;
pub mod core;
pub mod feed;
pub mod identity;
pub mod models;
pub mod posts;
pub mod static_server;
pub mod store;
pub mod users;

use auth::Sessions;
use store::Store;

/// Shared application state: the store and the in-process session table.
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub sessions: Sessions,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            sessions: Sessions::new(),
        }
    }
}

/// Route table, shared by the server binary and the integration tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/register", web::post().to(users::create_user))
        .route("/api/login", web::post().to(auth::login_user))
        .route("/api/logout", web::post().to(auth::logout_user))
        .route("/api/profile", web::get().to(users::get_profile))
        .route("/api/posts", web::get().to(posts::list_posts))
        .route("/api/posts", web::post().to(posts::create_post))
        .route("/api/posts/{id}/like", web::post().to(posts::toggle_like))
        .default_service(web::get().to(static_server::serve_static));
}
