use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use bookstore_cartservice::api::catalog::HttpBookCatalog;
use bookstore_cartservice::app_state::AppState;
use bookstore_cartservice::store::postgres::PgStore;
use bookstore_cartservice::{bootstrap, config, db, routes, swagger};
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let routes =
        routes::carts::routes_with_openapi().merge(routes::orders::routes_with_openapi());

    let mut openapi = routes.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Bookstore CartService API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi)?;

    tracing::info!("Running migrations...");
    let config = config::load()?;
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let pool = db::connect(&config.database.url).await?;
    let store = Arc::new(PgStore::new(pool));
    let catalog = Arc::new(HttpBookCatalog::new(reqwest::Client::new()));
    let state = AppState::new(store.clone(), store, catalog);

    let app = Router::new()
        .merge(routes)
        .merge(swagger_ui)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state);

    bootstrap::serve("CartService", app, &config.server.addr).await?;
    Ok(())
}
