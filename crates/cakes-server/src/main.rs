use cakes_server::{config::ServerConfig, run, Result};
use time::UtcOffset;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = ServerConfig::load()?;
    // Local offset can be only read while process is single threaded
    let local_offset = UtcOffset::current_local_offset().unwrap_or_else(|e| {
        tracing::warn!("Cannot determine local offset ({e}), using UTC");
        UtcOffset::UTC
    });

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run(args, local_offset))
}
