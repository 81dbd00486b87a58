#![doc = include_str!("../README.md")]

mod config;
mod driver;
mod telemetry;

use clap::Parser;
use config::{CliArgs, RunConfig};
use telemetry::init_telemetry;
use tokio::signal;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let stop = CancellationToken::new();
    tokio::spawn(shutdown_signal(stop.clone()));

    let report = driver::run(&config, stop).await?;

    #[cfg(feature = "tracing")]
    tracing::info!(
        admitted = report.admitted,
        rejected = report.rejected,
        peak_temporary = report.peak_temporary,
        interrupted = report.interrupted,
        "Run finished"
    );
    println!("{report}");

    Ok(())
}

fn log_startup_info(_config: &RunConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!("Starting load run with full config: {:#?}", _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting load run: {} jobs over {} eternal workers",
            _config.jobs,
            _config.pool.worker_count
        );
    }
}

async fn shutdown_signal(stop: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to install SIGTERM handler: {:?}", _e);
                core::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = core::future::pending::<()>();

    let ctrl_c = async {
        if let Err(_e) = signal::ctrl_c().await {
            #[cfg(feature = "tracing")]
            tracing::error!("Failed to install Ctrl+C handler: {:?}", _e);
            core::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Shutdown signal received, stopping submission...");

    stop.cancel();
}
