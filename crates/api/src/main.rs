// GymDesk API Server
// Entry point for the gym management REST API

mod config;
mod cookies;
mod extract;
mod handlers;
mod middleware;
mod routes;

use config::Config;
use dotenvy::dotenv;
use gymdesk_authz::{PermissionService, RoutePolicy};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub struct AppState {
    pub auth_service: gymdesk_auth::AuthService,
    pub permission_service: PermissionService,
    pub route_policy: RoutePolicy,
    pub cache: Arc<gymdesk_cache::Cache>,
    pub secure_cookies: bool,
}

const SESSION_CLEANUP_INTERVAL_SECS: u64 = 3600;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,gymdesk_api=debug,tower_http=debug".to_string()),
        )
        .init();

    tracing::info!("🚀 Starting GymDesk API Server");
    tracing::info!("📦 Version: {}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env();
    tracing::info!("🌍 Environment: {}", config.environment);
    tracing::info!("🔌 Server: {}:{}", config.server_host, config.server_port);

    // Initialize database
    tracing::info!("🗄️  Connecting to database...");
    let database = gymdesk_database::Database::new(config.database.clone())
        .await
        .expect("Failed to connect to database");
    database.ping().await.expect("Database ping failed");
    tracing::info!("✅ Database connected");

    // Initialize cache
    tracing::info!("⚡ Connecting to Redis...");
    let cache = gymdesk_cache::Cache::new(config.cache.clone())
        .await
        .expect("Failed to connect to Redis");
    cache.ping().await.expect("Redis ping failed");
    tracing::info!("✅ Redis connected");

    // Initialize JWT service
    let jwt_service = gymdesk_auth::JwtService::from_env().expect("Failed to initialize JWT service");
    tracing::info!("🔐 JWT service initialized");

    // Create auth service
    let auth_service = gymdesk_auth::AuthService::new(
        database.clone(),
        cache.clone(),
        jwt_service,
        gymdesk_auth::SecurityPolicy::from_env(),
    );
    tracing::info!("🔑 Auth service initialized");

    // Seed the permission catalog and role grants
    let permission_service = PermissionService::new(database.pool().clone(), cache.clone());
    permission_service
        .seed_catalog()
        .await
        .expect("Failed to seed permission catalog");
    tracing::info!("📋 Permission catalog ready");

    // Invalidated and expired sessions accumulate; sweep them hourly
    let session_repo = gymdesk_database::SessionRepository::new(database.pool().clone());
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(std::time::Duration::from_secs(SESSION_CLEANUP_INTERVAL_SECS))
                .await;
            match session_repo.cleanup_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Cleaned up {} expired sessions", n),
                Err(e) => tracing::error!("Session cleanup failed: {}", e),
            }
        }
    });

    // Create app state
    let state = Arc::new(AppState {
        auth_service,
        permission_service,
        route_policy: RoutePolicy::standard(),
        cache: Arc::new(cache),
        secure_cookies: config.secure_cookies(),
    });

    // Create router
    let app = routes::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    tracing::info!("📡 Routes configured:");
    tracing::info!("   GET  /health");
    tracing::info!("   POST /api/setup");
    tracing::info!("   POST /api/auth/login");
    tracing::info!("   POST /api/auth/refresh");
    tracing::info!("   POST /api/auth/logout");
    tracing::info!("   GET  /api/auth/me");
    tracing::info!("   *    /api/users, /api/events");

    // Start server
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("✅ Server ready at http://{}", addr);
    tracing::info!("🎯 Ready to accept requests!");

    axum::serve(listener, app).await.expect("Server error");

    Ok(())
}
