use crate::errors::{Error, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Runtime configuration. Flags override environment variables, which
/// override values loaded from a `.env` file.
#[derive(Debug, Clone, Parser)]
#[command(name = "vitals", version, about = "HTTP service for biometric device readings")]
pub struct Config {
    /// Full PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    #[arg(long, env = "DB_HOST")]
    pub db_host: Option<String>,

    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    #[arg(long, env = "DB_SSLMODE", default_value = "require")]
    pub db_sslmode: String,

    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = 20)]
    pub db_max_connections: u32,

    #[arg(long, env = "DB_ACQUIRE_TIMEOUT_SECS", default_value_t = 10)]
    pub db_acquire_timeout_secs: u64,

    #[arg(long, env = "SERVER_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "SERVER_PORT", default_value_t = 8080)]
    pub port: u16,
}

impl Config {
    /// `DATABASE_URL` if set, otherwise assembled from the `DB_*` parts.
    pub fn database_url(&self) -> Result<String> {
        if let Some(url) = &self.database_url {
            return Ok(url.clone());
        }

        match (&self.db_user, &self.db_password, &self.db_host, &self.db_name) {
            (Some(user), Some(password), Some(host), Some(name)) => Ok(format!(
                "postgres://{}:{}@{}/{}?sslmode={}",
                user, password, host, name, self.db_sslmode
            )),
            _ => Err(Error::Config(
                "set DATABASE_URL or all of DB_USER, DB_PASSWORD, DB_HOST, DB_NAME".to_string(),
            )),
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.db_acquire_timeout_secs)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("invalid listen address {}: {}", self.host, e)))
    }
}
