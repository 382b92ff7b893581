// ABOUTME: Main entry point for the tavern bridge
// ABOUTME: Initializes logging, config, the CDP driver, and the gateway loop

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tavern_bridge::console::ConsoleConnector;
use tavern_bridge::surface::CdpDriver;
use tavern_core::traits::SurfaceDriver;
use tavern_core::{Config, Gateway, RelayCoordinator};

#[derive(Parser, Debug)]
#[command(name = "tavern-bridge", about = "Relay chat messages to a browser-rendered surface")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run the browser headless regardless of the configured value
    #[arg(long)]
    headless: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Set up panic hook to log panics before they crash the process
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\nPANIC! Bridge crashed with the following error:\n");
        eprintln!("{}", panic_info);
        eprintln!("\nBacktrace:");
        eprintln!("{:?}", std::backtrace::Backtrace::force_capture());
    }));

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chromiumoxide=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting tavern bridge");

    dotenvy::dotenv().ok();
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if args.headless {
        config.surface.headless = true;
    }

    tracing::info!(
        endpoint = %config.surface.endpoint,
        driver = ?config.surface.driver,
        headless = config.surface.headless,
        identity = %config.relay.default_identity,
        persona_mode = config.relay.persona_mode,
        "Configuration loaded"
    );

    let driver: Arc<dyn SurfaceDriver> = Arc::new(CdpDriver::new(config.surface.clone()));
    let coordinator = Arc::new(RelayCoordinator::new(driver, &config));
    let connector = Arc::new(ConsoleConnector);
    let gateway = Gateway::new(connector, coordinator.clone(), config.relay.clone());

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            ctrl_c_cancel.cancel();
        }
    });

    tracing::info!("Bridge ready - type a message to relay it");
    gateway.run(cancel).await?;

    coordinator.shutdown().await;
    tracing::info!("Bridge stopped");
    Ok(())
}
