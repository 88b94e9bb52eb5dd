use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub server_addr: String,
    pub api_prefix: String,
    /// dev / staging / test / prod, reported by /health
    pub environment: String,
    pub db_max_connections: u32,

    // Rate limiting, requests per minute per peer IP
    pub rate_api_per_min: u32,

    pub log_dir: String,
    pub log_level: String,

    /// fill an empty store with sample departments, employees and leave requests
    pub seed_demo_data: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8000".to_string()),
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api/v1".to_string()),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()),
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", env::var("DB_MAX_CONNECTIONS").ok(), 5)?,
            rate_api_per_min: parse_var("RATE_API_PER_MIN", env::var("RATE_API_PER_MIN").ok(), 1000)?,
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            seed_demo_data: parse_var("SEED_DEMO_DATA", env::var("SEED_DEMO_DATA").ok(), false)?,
        })
    }
}

fn parse_var<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {value:?}")),
        None => Ok(default),
    }
}
