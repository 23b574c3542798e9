use anyhow::{Context, Result};
use clap::Parser;
use stt_relay::{create_router, AppState, Config};
use tracing::info;

/// Relay between browser speech-to-text clients and the hosted
/// transcription service.
#[derive(Debug, Parser)]
#[command(name = "stt-relay", version)]
struct Args {
    /// Path to the configuration file, without extension
    #[arg(long, default_value = "config/stt-relay")]
    config: String,

    /// Listening port (overrides the config file and the PORT variable)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    let port = args
        .port
        .or_else(|| std::env::var("PORT").ok().and_then(|value| value.parse().ok()))
        .unwrap_or(cfg.service.http.port);
    let bind = cfg.service.http.bind.clone();

    info!("{} starting", cfg.service.name);
    info!("Upstream endpoint: {}", cfg.upstream.url);
    info!("Default model: {}", cfg.upstream.default_model);

    let state = AppState::new(cfg);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((bind.as_str(), port))
        .await
        .with_context(|| format!("failed to bind {}:{}", bind, port))?;

    info!("Listening on {}:{}", bind, port);

    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
