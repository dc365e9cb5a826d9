use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: String,
}

/// Load the service configuration from the environment.
pub fn load() -> Result<Config> {
    Ok(Config {
        database: DatabaseConfig {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?,
        },
        server: ServerConfig {
            addr: std::env::var("LISTEN_ADDR").unwrap_or("0.0.0.0:3002".to_string()),
        },
    })
}
