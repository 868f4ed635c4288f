//! UpTrail - availability monitoring with multi-resolution uptime history.

use uptrail::config::ServerConfig;
use uptrail::scheduler::Scheduler;
use uptrail::store::HistoryFile;
use uptrail::web::Server;

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("uptrail=info".parse()?))
        .init();

    // Load configuration
    let cfg = ServerConfig::load()?;
    tracing::info!("Using history file at {}", cfg.data_path);
    if cfg.targets.is_empty() {
        tracing::warn!("No targets configured; set UPTRAIL_TARGETS to start probing");
    }

    let file = HistoryFile::new(&cfg.data_path);
    let scheduler = Scheduler::new(cfg.clone(), file.clone());

    if cfg.run_once {
        scheduler.run_cycle(Utc::now()).await?;
        return Ok(());
    }

    // Start web server
    if cfg.http_port != 0 {
        let server = Server::new(cfg.clone(), file);
        tokio::spawn(async move {
            if let Err(e) = server.start().await {
                tracing::error!("Web server stopped: {}", e);
            }
        });
    }

    // Start scheduler
    scheduler.start().await
}
