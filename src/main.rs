use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use clap::Parser;
use dwatch::DWatchConfig;
use dwatch::Result;
use dwatch::WatchStore;
use rand::Rng;
use tokio::signal::unix::signal;
use tokio::signal::unix::SignalKind;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;

/// Watches one key and, unless `--watch-only`, keeps rewriting and randomly
/// deleting it so every change shows up as an op.
#[derive(Parser, Debug)]
#[command(name = "dwatch", version, about)]
struct Cli {
    /// Key to watch and write
    #[arg(long, default_value = "hello")]
    key: String,

    /// Only watch, never write
    #[arg(long)]
    watch_only: bool,

    /// Pause between two writes
    #[arg(long, default_value_t = 1000)]
    write_interval_ms: u64,

    /// Extra config file merged over `CONFIG_PATH` and defaults
    #[arg(long)]
    config: Option<String>,

    /// Write logs to `<log_dir>/dwatch.log` instead of stdout
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = DWatchConfig::new()?;
    if let Some(path) = &cli.config {
        settings = settings.with_override_config(path)?;
    }
    let settings = settings.validate()?;

    // Initializing Logs
    let _guard = init_observability(cli.log_dir.as_ref());

    // Initializing Shutdown Signal
    let shutdown = CancellationToken::new();

    if let Some(addr) = settings.monitoring.metrics_addr() {
        tokio::spawn(dwatch::start_server(addr, shutdown.clone()));
    }

    let store = match WatchStore::open(&settings).await {
        Ok(store) => store,
        Err(e) => {
            error!("watch store init failed: {:?}", e);
            return Err(e);
        }
    };

    let mut stream = store.watch(&cli.key)?;

    if !cli.watch_only {
        tokio::spawn(run_writer(
            store.clone(),
            cli.key.clone(),
            Duration::from_millis(cli.write_interval_ms),
            shutdown.clone(),
        ));
    }

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = graceful_shutdown(shutdown).await {
                error!("Failed to shutdown: {:?}", e);
            }
        }
    });

    info!(key = %cli.key, "Application started. Waiting for CTRL+C signal...");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            op = stream.recv() => {
                match op {
                    Some(op) => info!("RECV: {}", op),
                    None => break,
                }
            }
        }
    }

    stream.close().await?;
    store.close().await?;
    println!("Exiting program.");
    Ok(())
}

/// Sets `key` to the current time, then deletes it with probability 1/2.
async fn run_writer(
    store: WatchStore,
    key: String,
    interval: Duration,
    shutdown: CancellationToken,
) {
    loop {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        info!("SEND");
        if let Err(e) = store.set(&key, &now.to_string()).await {
            error!(?e, "set failed");
        }

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(interval) => {}
        }

        if rand::thread_rng().gen_bool(0.5) {
            if let Err(e) = store.delete(&key).await {
                error!(?e, "delete failed");
            }
        }
    }
}

async fn graceful_shutdown(shutdown: CancellationToken) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT detected.");
        },
        _ = sigterm.recv() => {
            info!("SIGTERM detected.");
        },
        _ = shutdown.cancelled() => {
            return Ok(());
        },
    }

    info!("Shutdown..");
    shutdown.cancel();
    Ok(())
}

fn init_observability(log_dir: Option<&PathBuf>) -> Option<WorkerGuard> {
    match log_dir {
        Some(dir) => {
            let (non_blocking, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, "dwatch.log"));
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env());
            tracing_subscriber::registry().with(file_layer).init();
            Some(guard)
        }
        None => {
            let stdout_layer = tracing_subscriber::fmt::layer().with_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            );
            tracing_subscriber::registry().with(stdout_layer).init();
            None
        }
    }
}
