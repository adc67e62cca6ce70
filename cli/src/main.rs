//! EVCS CLI server
//!
//! Headless reservation, session and payment service for EV charging
//! stations, suitable for a systemd unit or a container.
//!
//! ```sh
//! # Run with default config (~/.config/evcs/config.toml)
//! evcs
//!
//! # Custom config path and port
//! evcs --config /etc/evcs/config.toml --api-port 8080
//!
//! # Validate config without starting
//! evcs --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use evcs_core::config::AppConfig;
use evcs_core::server::{init_tracing, ServerHandle, ServerOptions};

/// EV charging reservation, session and payment service.
#[derive(Parser, Debug)]
#[command(
    name = "evcs",
    version,
    about = "EV charging reservation, session and payment service",
    long_about = "REST API for charging spot availability, reservations, charging \
                  sessions and VNPay / MoMo payment reconciliation.\n\n\
                  Default config: ~/.config/evcs/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "EVCS_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(evcs_core::default_config_path);

    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            if cli.check {
                eprintln!("❌ Invalid configuration: {}", e);
                std::process::exit(1);
            }
            eprintln!("Failed to load config from {}: {}", config_path.display(), e);
            AppConfig::default()
        }
    };

    if let Some(port) = cli.api_port {
        config.server.api_port = port;
    }
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }

    if cli.check {
        println!("✅ Configuration is valid");
        println!("   Config file : {}", config_path.display());
        println!("   API address : {}", config.server.address());
        println!("   Database    : {}", config.database.url);
        println!("   Log level   : {}", config.logging.level);
        println!("   Base fee    : {}", config.billing.base_fee);
        for (name, check) in [
            ("VNPay", config.payments.vnpay.validate()),
            ("MoMo", config.payments.momo.validate()),
        ] {
            match check {
                Ok(()) => println!("   {:<11} : configured", name),
                Err(e) => println!("   {:<11} : {}", name, e),
            }
        }
        return Ok(());
    }

    init_tracing(&config);
    info!("Configuration: {}", config_path.display());

    let handle = match ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await
    {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start server: {}", e);
            return Err(e);
        }
    };

    handle.install_signal_handler();
    info!("🚀 Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
