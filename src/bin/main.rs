use actix_web::{web, App, HttpServer};
use anyhow::Context;

use texts::core::db::init_demo_data;
use texts::{config, store, AppState};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let kind = config::storage_kind()?;
    let db_file = config::database_file(kind);
    let store = store::open(kind, &db_file).with_context(|| {
        format!(
            "failed to open {kind:?} store at {}",
            db_file.display()
        )
    })?;
    init_demo_data(store.as_ref()).context("failed to seed demo data")?;

    let state = web::Data::new(AppState::new(store));
    let addr = config::listen_addr();
    tracing::info!(%addr, backend = ?kind, "server listening");

    HttpServer::new(move || App::new().app_data(state.clone()).configure(texts::routes))
        .bind(&addr)?
        .run()
        .await?;
    Ok(())
}
