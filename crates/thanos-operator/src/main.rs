//! Thanos operator entry point

use anyhow::Result;
use clap::Parser;
use thanos_operator::{cli::Cli, OperatorConfig, OperatorManager};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = OperatorConfig::from(Cli::parse());

    OperatorManager::new(config).await?.run().await
}
