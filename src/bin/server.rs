use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use uptimekite::config::{AppConfig, QueueBackend};
use uptimekite::db::{self, MonitorRepository, PgRepository};
use uptimekite::logging::init_logging;
use uptimekite::notifications::ChannelNotifier;
use uptimekite::probe::Prober;
use uptimekite::queue::{InMemoryQueue, JobQueue, PgJobQueue};
use uptimekite::scheduler::Scheduler;
use uptimekite::web::{AppState, create_router};
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
    init_logging(&config.log_dir, "server.log");

    let cron_secret = config
        .cron_secret
        .clone()
        .ok_or("CRON_SECRET is required for the server")?;

    info!("Connecting to database...");
    let pool = db::connect(&config.database_url, config.db_max_connections).await?;
    info!("Database ready.");
    let repository: Arc<dyn MonitorRepository> = Arc::new(PgRepository::new(pool.clone()));

    let queue: Arc<dyn JobQueue> = match config.queue_backend {
        QueueBackend::Postgres => Arc::new(PgJobQueue::new(pool, config.visibility_timeout())),
        QueueBackend::Memory => Arc::new(InMemoryQueue::new(config.visibility_timeout())),
    };

    let scheduler = Arc::new(Scheduler::new(repository.clone(), queue.clone()));
    if let Some(seconds) = config.scheduler_interval_seconds {
        tokio::spawn(scheduler.clone().run_periodic(Duration::from_secs(seconds)));
    }

    // The in-memory queue is only reachable from this process.
    let (worker_stop_tx, worker_stop_rx) = oneshot::channel::<()>();
    let worker_handle = if config.queue_backend == QueueBackend::Memory {
        let prober = Arc::new(Prober::new(repository.clone(), config.probe_settings())?);
        let notifier = Arc::new(ChannelNotifier::new(
            repository.clone(),
            config.notification_timeout(),
        )?);
        let worker = Arc::new(CheckWorker::new(
            repository.clone(),
            queue.clone(),
            prober,
            notifier,
            config.worker_settings(),
        ));
        Some(tokio::spawn(worker.run(async move {
            let _ = worker_stop_rx.await;
        })))
    } else {
        None
    };

    let app = create_router(Arc::new(AppState {
        scheduler,
        cron_secret,
    }));
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    info!(addr = %config.listen_addr, "HTTP server listening.");

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal.");
            }
            info!("Shutdown signal received.");
        })
        .await;

    let _ = worker_stop_tx.send(());
    if let Some(handle) = worker_handle {
        if let Err(e) = handle.await {
            warn!(error = %e, "Worker task ended abnormally.");
        }
    }

    served?;
    info!("Server stopped.");
    Ok(())
}
