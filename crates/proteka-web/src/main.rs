//! Proteka Web Server
//!
//! Run with: cargo run -p proteka-web

use proteka_chain::{ChainRecorder, IpfsClient};
use proteka_common::ProtekaConfig;
use proteka_db::Database;
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::var("PROTEKA_CONFIG").ok();
    let config = ProtekaConfig::load(config_path.as_deref().map(Path::new))?;

    info!("Starting Proteka web server...");

    let db = Database::connect(&config.database).await?;
    db.initialize().await?;

    let state = proteka_web::state::AppState::new(
        db.repository(),
        IpfsClient::new(&config.ipfs)?,
        ChainRecorder::new(&config.chain)?,
    );

    let app = proteka_web::router::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
