mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod service;
mod utils;

use std::sync::Arc;

use axum::http::{
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method,
};
use config::Config;
use db::DBClient;
use dotenv::dotenv;
use routes::create_router;
use service::{
    google_oauth::GoogleAuthService, parcel_service::ParcelService, seed::seed_super_admin,
    user_service::UserService,
};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
pub struct AppState {
    pub env: Config,
    pub db_client: Arc<DBClient>,
    pub user_service: Arc<UserService>,
    pub parcel_service: Arc<ParcelService>,
    pub google_auth: Arc<GoogleAuthService>,
}

impl AppState {
    pub fn new(env: Config, pool: PgPool) -> Self {
        let db_client = Arc::new(DBClient::new(pool));
        let google_auth = Arc::new(GoogleAuthService::new(&env));

        AppState {
            user_service: Arc::new(UserService::new(db_client.clone())),
            parcel_service: Arc::new(ParcelService::new(db_client.clone())),
            google_auth,
            db_client,
            env,
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "parcel_delivery=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match Config::init() {
        Ok(config) => config,
        Err(err) => {
            tracing::error!("invalid configuration: {}", err);
            std::process::exit(1);
        }
    };

    error::expose_error_details(config.is_development());

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            tracing::info!("connected to the database");
            pool
        }
        Err(err) => {
            tracing::error!("failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!("failed to run migrations: {:?}", err);
        std::process::exit(1);
    }

    let app_state = AppState::new(config.clone(), pool);

    if let Err(err) = seed_super_admin(&app_state.db_client, &config).await {
        tracing::error!("failed to seed super admin: {}", err);
    }

    let mut allowed_origins = Vec::new();
    for origin in [config.frontend_url.as_str(), "http://localhost:5173"] {
        match origin.trim_end_matches('/').parse::<HeaderValue>() {
            Ok(value) if !allowed_origins.contains(&value) => allowed_origins.push(value),
            Ok(_) => {}
            Err(_) => tracing::warn!("ignoring invalid CORS origin {}", origin),
        }
    }

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS]);

    let app = create_router(Arc::new(app_state)).layer(cors);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind port {}: {}", config.port, err);
            std::process::exit(1);
        }
    };

    tracing::info!("server is running on http://localhost:{}", config.port);

    if let Err(err) = axum::serve(listener, app).await {
        tracing::error!("server error: {}", err);
    }
}
