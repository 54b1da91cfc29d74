use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// radiod: headless internet radio appliance
#[derive(Parser)]
#[command(name = "radiod", version, about)]
struct Cli {
    /// Path to the config file (TOML).
    #[arg(short, long, default_value = "/etc/radiod/config.toml")]
    config: PathBuf,

    /// Enable JSON log output (for journald).
    #[arg(long)]
    json: bool,

    /// Validate config and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("radiod=info"));

    if cli.json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    info!("radiod v{}", env!("CARGO_PKG_VERSION"));

    let config_path = cli
        .config
        .canonicalize()
        .unwrap_or_else(|_| cli.config.clone());
    let config = radiod::config::load(&config_path)?;

    if cli.check {
        println!(
            "config OK: {} stations, buttons {}, remote {}, web {}",
            config.stations.len(),
            if config.buttons.is_some() { "on" } else { "off" },
            if config.remote.is_some() { "on" } else { "off" },
            if config.web.enabled { "on" } else { "off" },
        );
        return Ok(());
    }

    info!("loaded config: {} stations", config.stations.len());

    radiod::daemon::run(config, &config_path).await?;

    Ok(())
}
