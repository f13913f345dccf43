pub mod application;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod openapi;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

pub use db::{create_pool, DbPool};

use handlers::AppState;
use infrastructure::DieselStore;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut conn = pool.get()?;
    let applied = conn.run_pending_migrations(MIGRATIONS)?;
    log::info!("Applied {} pending migration(s)", applied.len());
    Ok(())
}

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let state = web::Data::new(AppState::new(DieselStore::new(pool)));

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .service(openapi::swagger_ui())
            .service(
                web::scope("/cart")
                    .route("", web::get().to(handlers::cart::view_cart))
                    .route("/items", web::post().to(handlers::cart::add_item))
                    .route("/items/{product_id}", web::put().to(handlers::cart::update_item))
                    .route("/items/{product_id}", web::delete().to(handlers::cart::remove_item)),
            )
            .service(
                web::scope("/discounts")
                    .route("/validate", web::get().to(handlers::discounts::validate_discount)),
            )
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::orders::place_order))
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route("/{id}/cancel", web::post().to(handlers::orders::cancel_order))
                    .route("/{id}/confirm", web::post().to(handlers::orders::confirm_order))
                    .route("/{id}/deliver", web::post().to(handlers::orders::deliver_order)),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
