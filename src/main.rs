use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use phonebook_api::config::Config;
use phonebook_api::db;
use phonebook_api::deletion_log::DeletionLog;
use phonebook_api::http::{self, AppState};
use phonebook_api::repository::ContactRepository;
use phonebook_api::service::ContactService;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();

    let pool = db::initialize(&config.database_url).await?;

    let deletion_log = DeletionLog::new(config.deletion_log_path.clone())
        .context("failed to set up deletion log")?;

    let service = ContactService::new(ContactRepository::new(pool.clone()), Arc::new(deletion_log));
    let state = AppState { service, pool };
    let app = http::router(state, &config.cors_allowed_origins);

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    tracing::info!(addr = %config.bind_addr, "server running");

    axum::serve(listener, app).await?;
    Ok(())
}
