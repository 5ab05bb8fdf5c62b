use mimalloc::MiMalloc;
use tracing::{error, info};

use vidmerge::config::AppConfig;
use vidmerge::services::ServiceContainer;
use vidmerge::{logging, panic_hook};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    let _log_guard = logging::init_logging(config.log_dir.as_deref())?;
    panic_hook::install();

    info!(version = env!("CARGO_PKG_VERSION"), "Starting vidmerge");

    let mut services = ServiceContainer::new(config);
    services.start().await?;

    let server = services.api_server();
    let cancel_token = services.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            cancel_token.cancel();
        }
    });

    let result = server.run().await;
    if let Err(e) = &result {
        error!(error = %e, "Server stopped with error");
    }

    services.shutdown().await;
    result?;
    Ok(())
}
