//! `weatherinfo`: shows current conditions, or the last stored reading when
//! the network or location is unavailable. Also manages the config file and
//! the stored record. Logs go to stderr, filtered by `RUST_LOG` or the
//! configured `log_level`.

use clap::Parser;
use tracing_subscriber::EnvFilter;
use weatherinfo_core::Config;

mod cli;
mod render;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    let config = Config::load()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.as_deref().unwrap_or("warn")))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    cmd.run(config).await
}
