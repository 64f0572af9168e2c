use playcue::api::{ApiServer, ApiServerConfig, AppState};
use playcue::config::AppConfig;
use playcue::database;
use playcue::logging;
use playcue::services::ServiceContainer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env_or_default()?;

    // Initialize logging; keep the guard alive for the process lifetime
    let (logging_config, _log_guard) = logging::init_logging(&config.log_dir)?;

    // Initialize database
    let pool = database::init_pool(&config.database_url).await?;
    let write_pool = database::init_write_pool(&config.database_url).await?;
    database::run_migrations(&pool).await?;

    // Build and start services
    let container = ServiceContainer::new(pool, write_pool, config.default_timezone).await?;
    container.initialize().await?;

    logging_config.start_retention_cleanup(container.cancellation_token());

    // API server
    let state = AppState::with_services(
        container.scheduler.clone(),
        container.action_repository.clone(),
        container.health_reporter.clone(),
        container.calendar.clone(),
    )
    .with_logging_config(logging_config);

    let server = ApiServer::with_state(ApiServerConfig::from_env_or_default(), state);
    let server_cancel = server.cancel_token();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal");
            server_cancel.cancel();
        }
    });

    tracing::info!("playcue initialized successfully");

    server.run().await?;
    container.shutdown().await;

    Ok(())
}
