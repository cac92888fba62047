use clap::Args;

use crate::config;
use crate::server;

#[derive(Debug, Args)]
pub struct ServeArgs {
    #[arg(long, help = "Port to listen on (defaults to STOREFRONT_PORT / PORT / 8000)")]
    pub port: Option<u16>,

    #[arg(long, help = "Use a process-local in-memory store instead of PostgreSQL")]
    pub memory: bool,
}

pub async fn handle(args: ServeArgs) -> anyhow::Result<()> {
    let config = config::config();
    tracing::info!("Starting Storefront API in {:?} mode", config.environment);

    let state = server::build_state(config, args.memory).await?;
    server::serve(config, state, args.port.unwrap_or(config.api.port)).await
}
