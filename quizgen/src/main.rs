use clap::Parser;
use quizgen::{Application, Config, telemetry};
use tokio::signal;

/// Resolves on Ctrl+C, or a failed handler install (never).
async fn interrupt() {
    if let Err(e) = signal::ctrl_c().await {
        tracing::warn!(error = %e, "Ctrl+C handler unavailable");
        std::future::pending::<()>().await;
    }
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut stream) => {
            stream.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

/// Completes when the process is asked to stop; in-flight requests are then drained.
async fn shutdown_requested() {
    let signal_name = tokio::select! {
        _ = interrupt() => "SIGINT",
        _ = terminate() => "SIGTERM",
    };
    tracing::info!(signal = signal_name, "Shutdown requested, draining in-flight requests");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = quizgen::config::Args::parse();
    let config = Config::load(&args)?;

    if args.validate {
        println!("Configuration is valid.");
        return Ok(());
    }

    telemetry::init_telemetry(config.log_format)?;
    tracing::debug!(?args, "Starting quiz service");

    Application::new(config).await?.serve(shutdown_requested()).await
}
