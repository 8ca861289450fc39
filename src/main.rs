use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware::Logger};
use anyhow::Result;

use workdocs::{
    config::{self, Config},
    database::init_database,
    handlers::system,
    middleware::{RateLimiters, RequestIdMiddleware, RequestInfoMiddleware},
    routes,
    services::expiry::run_expiry_scanner,
};

const RATE_LIMIT_CLEANUP_SECS: u64 = 300;

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting WorkDocs API server...");

    let config = config::init(Config::from_env()?);
    log::info!("Configuration loaded (environment: {})", config.environment);

    init_database(&config.database_url).await?;
    log::info!("Database initialized");

    tokio::spawn(run_expiry_scanner(config.expiry_scan_interval_secs));
    log::info!(
        "Expiry scanner running every {}s",
        config.expiry_scan_interval_secs
    );

    let limiters = RateLimiters::from_config(config);
    limiters.spawn_pruning(RATE_LIMIT_CLEANUP_SECS);

    let server_address = config.server_address();
    log::info!("Server starting on http://{}", server_address);

    HttpServer::new(move || {
        App::new()
            .wrap(limiters.general.clone())
            .wrap(
                Cors::default()
                    .allowed_origin(&config.client_base_url)
                    .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                    .allowed_headers(vec![
                        "Authorization",
                        "Content-Type",
                        "Accept",
                        "X-Requested-With",
                        "X-Correlation-ID",
                    ])
                    .max_age(3600),
            )
            .wrap(RequestInfoMiddleware)
            .wrap(RequestIdMiddleware)
            .wrap(Logger::new(
                r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T correlation_id=%{x-correlation-id}o"#,
            ))
            .service(system::banner)
            .service(system::health)
            .configure(|cfg| routes::configure(cfg, &limiters))
    })
    .bind(&server_address)?
    .run()
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
