use storefront_api::{config, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, SECRET_KEY, etc.
    let _ = dotenvy::dotenv();

    config::init_tracing("storefront_api=info,tower_http=info");

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Storefront API in {:?} mode", config.environment);

    let state = server::build_state(config, false).await?;
    server::serve(config, state, config.api.port).await
}
