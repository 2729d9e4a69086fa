mod cli;
mod routes;
mod scan;

use anyhow::Context;
use clap::Parser;
use engine_logging::engine_info;
use scanner_core::ScanConfig;

use crate::cli::{Cli, Command, ScanArgs, ServeArgs};
use crate::routes::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    engine_logging::initialize(cli.log, cli.log_level);

    let config = cli.scan.scan_config()?;
    cli.scan.log_effective(&config);

    match cli.command {
        Command::Serve(args) => serve(args, &cli.scan, config).await,
        Command::Scan(args) => scan::run(args, &cli.scan, config).await,
    }
}

async fn serve(args: ServeArgs, scan: &ScanArgs, config: ScanConfig) -> anyhow::Result<()> {
    let registry = scan.build_registry()?;
    engine_info!(
        "Platforms: [{}]",
        registry.platforms().collect::<Vec<_>>().join(", ")
    );
    let app = router(AppState::new(registry, config));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    engine_info!("Like-Scanner API listening on {}", args.bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("http server failed")?;
    engine_info!("Like-Scanner API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler the server runs until killed.
        std::future::pending::<()>().await;
    }
}
