use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mecanum_shooter_runtime::config::RobotConfig;

/// Control runtime for the mecanum shooter robot
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML file overriding the built-in tuning
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Driver-station port of the operator gamepad
    #[arg(long)]
    controller: Option<u8>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    dump_config: bool,
}

fn load_config(args: &Args) -> Result<RobotConfig, Box<dyn std::error::Error + Send + Sync>> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from {}", path.display());
            RobotConfig::load(path)?
        }
        None => RobotConfig::default(),
    };
    if let Some(port) = args.controller {
        config.controller_port = port;
    }
    Ok(config)
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(1);
        }
    };

    if args.dump_config {
        match toml::to_string_pretty(&config) {
            Ok(text) => print!("{}", text),
            Err(e) => {
                eprintln!("Cannot serialize config: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = mecanum_shooter_runtime::runtime::run(config).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
