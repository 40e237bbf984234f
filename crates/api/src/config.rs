use gymdesk_cache::CacheConfig;
use gymdesk_database::DatabaseConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_host: std::env::var("SERVER_HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: std::env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3000),
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            database: DatabaseConfig::from_env(),
            cache: CacheConfig::from_env(),
        }
    }

    /// Cookies carry the Secure attribute outside local development
    pub fn secure_cookies(&self) -> bool {
        self.environment == "production"
    }
}
