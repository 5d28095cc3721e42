use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{error, info};

use uptimekite::config::{AppConfig, QueueBackend};
use uptimekite::db::{self, MonitorRepository, PgRepository};
use uptimekite::logging::init_logging;
use uptimekite::notifications::ChannelNotifier;
use uptimekite::probe::Prober;
use uptimekite::queue::{JobQueue, PgJobQueue};
use uptimekite::worker::CheckWorker;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();
    let config = AppConfig::load(args.config.as_deref())?;
    init_logging(&config.log_dir, "worker.log");

    if config.queue_backend == QueueBackend::Memory {
        return Err("the memory queue backend runs its worker inside the server process".into());
    }

    info!("Connecting to database...");
    let pool = db::connect(&config.database_url, config.db_max_connections).await?;
    info!("Database ready.");

    let repository: Arc<dyn MonitorRepository> = Arc::new(PgRepository::new(pool.clone()));
    let queue: Arc<dyn JobQueue> = Arc::new(PgJobQueue::new(pool, config.visibility_timeout()));
    let prober = Arc::new(Prober::new(repository.clone(), config.probe_settings())?);
    let notifier = Arc::new(ChannelNotifier::new(
        repository.clone(),
        config.notification_timeout(),
    )?);

    let worker = Arc::new(CheckWorker::new(
        repository,
        queue,
        prober,
        notifier,
        config.worker_settings(),
    ));

    worker
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal.");
            }
            info!("Shutdown signal received.");
        })
        .await;
    Ok(())
}
