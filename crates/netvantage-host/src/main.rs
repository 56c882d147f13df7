#![deny(unsafe_code)]
#![deny(clippy::all)]

use clap::Parser;
use netvantage_host::Args;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,netvantage_host=info")))
        .init();

    let args = Args::parse();
    netvantage_host::run(args).await
}
