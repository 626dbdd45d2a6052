//! RentShare backend server
//!
//! Peer-to-peer rental marketplace: listings, availability, bookings,
//! reviews, messaging and moderation over a JSON API.

use actix_cors::Cors;
use actix_web::{http::header, middleware, web, App, HttpResponse, HttpServer};
use rentshare_api::{health_check, AppState, Repositories};
use rentshare_auth::JwtService;
use rentshare_cache::{spawn_sweeper, CacheLayer, MemoryCache, RedisStore, StorageCache};
use rentshare_core::{pricing::PricingPolicy, AppConfig};
use rentshare_db::{
    create_pool, run_migrations, PgBookingRepository, PgCategoryRepository,
    PgConversationRepository, PgFavoriteRepository, PgItemImageRepository, PgItemRepository,
    PgMessageRepository, PgNotificationRepository, PgPool, PgProfileRepository,
    PgReportRepository, PgReviewRepository,
};
use rentshare_storage::{FileStorage, S3ObjectStore};
use std::env;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging
fn init_tracing() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "rentshare={lvl},rentshare_api={lvl},rentshare_services={lvl},rentshare_db={lvl},\
             rentshare_cache={lvl},rentshare_storage={lvl},actix_web=info,sqlx=warn",
            lvl = log_level
        ))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

fn repositories(pool: &PgPool) -> Repositories {
    Repositories {
        profiles: Arc::new(PgProfileRepository::new(pool.clone())),
        items: Arc::new(PgItemRepository::new(pool.clone())),
        categories: Arc::new(PgCategoryRepository::new(pool.clone())),
        images: Arc::new(PgItemImageRepository::new(pool.clone())),
        bookings: Arc::new(PgBookingRepository::new(pool.clone())),
        reviews: Arc::new(PgReviewRepository::new(pool.clone())),
        conversations: Arc::new(PgConversationRepository::new(pool.clone())),
        messages: Arc::new(PgMessageRepository::new(pool.clone())),
        favorites: Arc::new(PgFavoriteRepository::new(pool.clone())),
        notifications: Arc::new(PgNotificationRepository::new(pool.clone())),
        reports: Arc::new(PgReportRepository::new(pool.clone())),
    }
}

/// Two-level cache when Redis is reachable, memory only otherwise
async fn build_cache(config: &AppConfig) -> CacheLayer {
    let memory = Arc::new(MemoryCache::new(config.cache.memory_max_entries));
    let default_ttl = Duration::from_secs(config.cache.default_ttl_secs);

    if !config.cache.use_storage {
        info!("Persistent cache disabled; using memory cache only");
        return CacheLayer::new(memory, None, default_ttl);
    }

    let store = match RedisStore::new(&config.redis.url).await {
        Ok(store) => store.ping().await.map(|_| store),
        Err(e) => Err(e),
    };

    match store {
        Ok(store) => {
            info!("Persistent cache connected");
            CacheLayer::new(memory, Some(StorageCache::new(Arc::new(store))), default_ttl)
        }
        Err(e) => {
            warn!("Redis unavailable ({}); falling back to memory cache only", e);
            CacheLayer::new(memory, None, default_ttl)
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    init_tracing();

    info!("Starting RentShare backend v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        io::Error::other(e)
    })?;

    info!("Connecting to database...");
    let pool = create_pool(&config.database).await.map_err(io::Error::other)?;
    if config.database.run_migrations {
        run_migrations(&pool).await.map_err(io::Error::other)?;
    }

    let cache = Arc::new(build_cache(&config).await);
    spawn_sweeper(
        cache.clone(),
        Duration::from_secs(config.cache.sweep_interval_secs),
    );

    let jwt_service = Arc::new(JwtService::new(
        &config.auth.jwt_secret,
        config.auth.jwt_expiration_secs,
    ));
    info!(
        "JWT service configured with {} second token expiration",
        config.auth.jwt_expiration_secs
    );

    let object_store = S3ObjectStore::new(&config.storage).map_err(io::Error::other)?;
    let files = FileStorage::new(Arc::new(object_store), config.storage.public_base_url.clone());

    info!(
        "Service fee {}%, amounts in {}",
        config.booking.service_fee_percent, config.booking.currency
    );

    let state = web::Data::new(AppState::new(
        repositories(&pool),
        cache,
        jwt_service.clone(),
        files,
        PricingPolicy::new(config.booking.service_fee_percent),
    ));

    let bind_addr = config.server_addr();
    let workers = config.server.workers.max(1);
    let cors_origins = config.server.cors_origins.clone();
    info!("Starting HTTP server on {} with {} workers", bind_addr, workers);

    HttpServer::new(move || {
        let origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                origin
                    .to_str()
                    .map(|o| origins.split(',').any(|allowed| allowed.trim() == o))
                    .unwrap_or(false)
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                header::AUTHORIZATION,
                header::ACCEPT,
                header::CONTENT_TYPE,
                header::COOKIE,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(state.clone())
            .app_data(web::Data::new(jwt_service.clone()))
            .app_data(web::JsonConfig::default().limit(256 * 1024))
            .app_data(web::QueryConfig::default().error_handler(|err, _req| {
                let error_message = err.to_string();
                actix_web::error::InternalError::from_response(
                    err,
                    HttpResponse::BadRequest().json(serde_json::json!({
                        "error": "invalid_query",
                        "message": error_message,
                        "status": 400
                    })),
                )
                .into()
            }))
            .wrap(cors)
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(middleware::NormalizePath::trim())
            .route("/health", web::get().to(health_check))
            .service(web::scope("/api/v1").configure(rentshare_api::configure))
    })
    .workers(workers)
    .bind(&bind_addr)?
    .run()
    .await
}
