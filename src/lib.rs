pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod schema;
pub mod store;

#[cfg(test)]
mod testutil;

use actix_web::{middleware::Logger, web, App, HttpResponse, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use db::{create_pool, DbPool};
use store::{CatalogStore, OrderEngine};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::products::create_product,
        handlers::products::list_products,
        handlers::products::get_product,
        handlers::products::update_product,
        handlers::products::delete_product,
        handlers::orders::place_order,
        handlers::orders::list_orders,
        handlers::orders::get_order,
        handlers::orders::set_order_status,
    ),
    components(schemas(
        handlers::products::CreateProductRequest,
        handlers::products::UpdateProductRequest,
        handlers::products::ProductResponse,
        handlers::products::IdResponse,
        handlers::orders::PlaceOrderRequest,
        handlers::orders::OrderResponse,
        handlers::orders::OrderViewResponse,
    )),
    tags(
        (name = "products", description = "Product catalog"),
        (name = "orders", description = "Order placement and views"),
    )
)]
struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let catalog = web::Data::new(CatalogStore::new(pool.clone()));
    let engine = web::Data::new(OrderEngine::new(pool));

    Ok(HttpServer::new(move || {
        App::new()
            .app_data(catalog.clone())
            .app_data(engine.clone())
            // Malformed or schema-invalid bodies are a presentation-boundary
            // concern and surface as 422 rather than actix's default 400.
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::UnprocessableEntity()
                        .json(serde_json::json!({ "error": message })),
                )
                .into()
            }))
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .service(
                web::scope("/products")
                    .route("", web::post().to(handlers::products::create_product))
                    .route("", web::get().to(handlers::products::list_products))
                    .route("/{id}", web::get().to(handlers::products::get_product))
                    .route("/{id}", web::put().to(handlers::products::update_product))
                    .route("/{id}", web::delete().to(handlers::products::delete_product)),
            )
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::orders::place_order))
                    .route("", web::get().to(handlers::orders::list_orders))
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route("/{id}/status", web::patch().to(handlers::orders::set_order_status)),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
