mod config;
mod errors;
mod handlers;
mod middleware;
mod models;
mod routes;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, HttpResponse};
use config::AppConfig;
use handlers::auth::TokenCodec;
use log::{error, info, warn};
use middleware::{auth_middleware::AuthMiddleware, request_logger::RequestLogger};
use routes::{
    categories::config_category_routes, products::config_product_routes,
    user_auth::config_user_auth_routes, users::config_user_routes,
};
use shuttle_actix_web::ShuttleActixWeb;
use shuttle_runtime::SecretStore;

#[shuttle_runtime::main]
async fn main(
    #[shuttle_runtime::Secrets] secrets: SecretStore,
) -> ShuttleActixWeb<impl FnOnce(&mut web::ServiceConfig) + Send + Clone + 'static> {
    info!("=== Catalog API Server Starting ===");

    let config = AppConfig::from_secrets(&secrets).map_err(|e| {
        error!("Invalid configuration: {}", e);
        shuttle_runtime::Error::Custom(anyhow::anyhow!(e))
    })?;

    let pool = match handlers::db::connect(&config.database_url).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to Postgres: {}", e);
            return Err(shuttle_runtime::Error::Custom(anyhow::anyhow!(
                "Database connection failed"
            )));
        }
    };

    if handlers::db::check_db_connection(&pool).await {
        info!("Database connection established and verified");
    } else {
        warn!("Database connection established but verification failed");
    }

    let codec = TokenCodec::new(&config.jwt_secret);

    let service_config = move |cfg: &mut web::ServiceConfig| {
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        cfg.app_data(web::Data::new(pool.clone()));
        cfg.app_data(web::Data::new(codec.clone()));
        cfg.app_data(errors::json_config());
        cfg.app_data(errors::path_config());
        cfg.service(
            web::scope("")
                .wrap(AuthMiddleware::new(codec))
                .wrap(RequestLogger)
                .wrap(Logger::new(
                    "%t [%s] \"%r\" %b %D ms \"%{User-Agent}i\" %a",
                ))
                .wrap(cors)
                .service(
                    web::scope("/api")
                        .configure(config_user_auth_routes)
                        .configure(config_user_routes)
                        .configure(config_category_routes)
                        .configure(config_product_routes),
                )
                .route(
                    "/",
                    web::get().to(|| async { HttpResponse::Ok().body("Welcome to the Catalog API") }),
                ),
        );
    };

    info!("Starting Catalog API Server with Shuttle...");
    Ok(service_config.into())
}
