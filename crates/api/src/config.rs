//! Application configuration loaded from a `.env` file and the environment.

use consumer::Topology;
use consumer::amqp::{ORDER_CONFIRMED_EXCHANGE, ORDER_CONFIRMED_QUEUE};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables (`main` loads a `.env` file into the
/// environment first, without overriding variables already set):
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `DATABASE_URL`: PostgreSQL URL; unset means an in-memory store
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: `5`)
/// - `AMQP_URL`: RabbitMQ URL; unset disables the order-confirmed consumer
/// - `ORDER_CONFIRMED_EXCHANGE` / `ORDER_CONFIRMED_QUEUE`: subscription names
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `OTEL_SERVICE_NAME`: service name on trace spans (default: `"cart-service"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub amqp_url: Option<String>,
    pub topology: Topology,
    pub log_level: String,
    pub otel_service_name: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: get("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            database_url: non_empty("DATABASE_URL"),
            database_max_connections: get("DATABASE_MAX_CONNECTIONS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.database_max_connections),
            amqp_url: non_empty("AMQP_URL"),
            topology: Topology::new(
                get("ORDER_CONFIRMED_EXCHANGE").unwrap_or(defaults.topology.exchange),
                get("ORDER_CONFIRMED_QUEUE").unwrap_or(defaults.topology.queue),
            ),
            log_level: get("RUST_LOG").unwrap_or(defaults.log_level),
            otel_service_name: non_empty("OTEL_SERVICE_NAME")
                .unwrap_or(defaults.otel_service_name),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            database_max_connections: 5,
            amqp_url: None,
            topology: Topology::new(ORDER_CONFIRMED_EXCHANGE, ORDER_CONFIRMED_QUEUE),
            log_level: "info".to_string(),
            otel_service_name: "cart-service".to_string(),
        }
    }
}
