use actix_web::HttpServer;
use anyhow::Context;

mod api;
mod config;
mod db;
mod docs;
mod errors;
mod model;
mod routes;
mod seed;
mod utils;

#[cfg(test)]
mod tests;

use config::Config;
use db::init_db;

use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(
            EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    info!(environment = %config.environment, addr = %config.server_addr, "Server starting...");

    let pool = init_db(&config).await?;
    if config.seed_demo_data {
        seed::seed_demo_data(&pool).await?;
    }
    let rate_limit = routes::rate_limiter(config.rate_api_per_min)?;

    let server_addr = config.server_addr.clone();

    HttpServer::new(move || routes::app(pool.clone(), config.clone(), rate_limit.clone()))
        .bind(&server_addr)
        .with_context(|| format!("Failed to bind {server_addr}"))?
        .run()
        .await
        .context("Server terminated abnormally")?;

    info!("Server stopped");

    Ok(())
}
