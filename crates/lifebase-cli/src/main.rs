use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod commands;
mod config;
mod format;

use commands::RunContext;
use config::Config;

#[derive(Parser)]
#[command(name = "lifebase")]
#[command(
    author,
    version,
    about = "Scan LifeBase BLE devices and send their measurements to an MQTT broker",
    long_about = None
)]
struct Cli {
    /// Only consider devices with these addresses (repeatable)
    #[arg(short = 'd', long = "device", global = true)]
    devices: Vec<String>,

    /// The advertised name LifeBase devices share
    #[arg(short = 'n', long = "device-name", global = true)]
    device_name: Option<String>,

    /// Do not wait longer than this many seconds for devices to answer
    #[arg(short = 't', long, global = true)]
    timeout: Option<u64>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the air for LifeBase devices and list them
    Discover,

    /// Scan LifeBase devices and print their measurements
    Scan {
        /// Display the attribute tree as seen on the BLE device
        #[arg(short = 'b', long = "ble-view")]
        ble_view: bool,

        /// The UUID of a service of interest (repeatable)
        #[arg(short = 's', long = "service-filter")]
        services: Vec<Uuid>,

        /// The UUID of a characteristic of interest (repeatable)
        #[arg(short = 'c', long = "characteristic-filter")]
        characteristics: Vec<Uuid>,

        /// The UUID of a descriptor of interest (repeatable)
        #[arg(short = 'D', long = "descriptor-filter")]
        descriptors: Vec<Uuid>,
    },

    /// Scan LifeBase devices and send their measurements to the MQTT broker
    Interconnect {
        /// The MQTT broker hostname to send the data to
        #[arg(short = 'H', long)]
        hostname: Option<String>,

        /// The MQTT broker port to send the data to
        #[arg(short = 'p', long)]
        port: Option<u16>,

        /// The UUID of a service of interest (repeatable)
        #[arg(short = 's', long = "service-filter")]
        services: Vec<Uuid>,

        /// The UUID of a characteristic of interest (repeatable)
        #[arg(short = 'c', long = "characteristic-filter")]
        characteristics: Vec<Uuid>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };

    let ctx = RunContext::new(
        config,
        &cli.devices,
        cli.device_name.as_deref(),
        cli.timeout,
    );

    match cli.command {
        Commands::Discover => commands::discover::cmd_discover(&ctx).await,
        Commands::Scan {
            ble_view,
            services,
            characteristics,
            descriptors,
        } => commands::scan::cmd_scan(ctx, ble_view, services, characteristics, descriptors).await,
        Commands::Interconnect {
            hostname,
            port,
            services,
            characteristics,
        } => {
            commands::interconnect::cmd_interconnect(ctx, hostname, port, services, characteristics)
                .await
        }
    }
}
