use std::time::Duration;

use lumina_server::{BackgroundTasks, Config, ServerState, print_banner, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Environment (dotenv, logger)
    setup_environment();

    print_banner();

    // 2. Configuration
    let config = Config::from_env();
    tracing::info!(
        environment = %config.environment,
        work_dir = %config.work_dir,
        "Lumina server starting..."
    );

    // 3. State: database plus services
    let state = ServerState::initialize(&config).await?;

    // 4. Background tasks (expiration sweeper)
    let mut tasks = BackgroundTasks::new();
    state.start_background_tasks(&mut tasks);

    // 5. Run until Ctrl-C, then drain the tasks
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    let limit = Duration::from_millis(config.shutdown_timeout_ms);
    if tokio::time::timeout(limit, tasks.shutdown()).await.is_err() {
        tracing::error!(timeout_ms = config.shutdown_timeout_ms, "Background tasks did not stop in time");
    }

    tracing::info!("Lumina server stopped");
    Ok(())
}
