use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use pto_monitor::config::{Args, MonitorConfig};

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(
            "info".parse().expect("static directive parses"),
        ))
        .init();

    let config = match MonitorConfig::try_from(Args::parse()) {
        Ok(config) => config,
        Err(e) => Args::command().error(ErrorKind::ValueValidation, e).exit(),
    };

    if let Err(e) = pto_monitor::runtime::run(config).await {
        eprintln!("Monitor error: {}", e);
        std::process::exit(1);
    }
}
