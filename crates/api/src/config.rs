//! Application configuration loaded from environment variables.

/// Server settings and the choice of membership store.
///
/// Environment variables:
/// - `HOST`: bind address, `"0.0.0.0"` by default
/// - `PORT`: listen port, `3000` by default
/// - `RUST_LOG`: tracing filter directive, `"info"` by default
/// - `DATABASE_URL`: PostgreSQL connection string; when unset or blank the
///   in-memory store is used
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            database_url: database_url(std::env::var("DATABASE_URL").ok()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns true if memberships are persisted in PostgreSQL.
    pub fn uses_postgres(&self) -> bool {
        self.database_url.is_some()
    }
}

/// A blank `DATABASE_URL` counts as unset.
fn database_url(value: Option<String>) -> Option<String> {
    value
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
        }
    }
}
