use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};

use promptmeter::config;
use promptmeter::db;
use promptmeter::models::{Feature, MeterAuthority};
use promptmeter::routes;
use promptmeter::services::MeteringService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = config::Config::from_env().map_err(|e| {
        log::error!("Configuration error: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;

    log::info!("Starting Promptmeter server on {}:{}", config.host, config.port);

    let db_pool = db::create_pool(&config.database).await.map_err(|e| {
        log::error!("Database pool error: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    db::run_migrations(&db_pool).await.map_err(|e| {
        log::error!("Migration error: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    // Shared with operation executors mounted alongside the ledger routes
    let metering = MeteringService::new(db_pool.clone(), &config.metering).map_err(|e| {
        log::error!("Metering setup error: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    for feature in [
        Feature::BrandAnalysis,
        Feature::CaptionGeneration,
        Feature::ImageGeneration,
    ] {
        let authority = match metering.policy().authority_for(feature) {
            MeterAuthority::Ledger => "ledger",
            MeterAuthority::External => "external usage tracker",
        };
        log::info!("{} metered by {}", feature, authority);
    }

    if config.billing.webhook_secret.is_none() {
        log::warn!("BILLING_WEBHOOK_SECRET not set, plan changes via /internal are disabled");
    }

    let host = config.host.clone();
    let port = config.port;

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allow_any_origin()
            .allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CONTENT_TYPE,
            ])
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(db_pool.clone()))
            .app_data(web::Data::new(config.identity.clone()))
            .app_data(web::Data::new(config.billing.clone()))
            .app_data(web::Data::new(metering.clone()))
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(cors)
            .configure(routes::health::configure)
            .configure(routes::subscriptions::configure)
            .configure(routes::billing::configure)
    })
    .bind((host.as_str(), port))?
    .shutdown_timeout(30)
    .run();

    let server_handle = server.handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        log::info!("Shutdown signal received, stopping server...");
        server_handle.stop(true).await;
    });

    server.await
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                log::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
