use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let config = config::Config::load(&args.config)?;

    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_filter.clone())),
        )
        .init();

    let control_addr = match args.control_addr.as_deref() {
        Some(s) => s.parse().context("invalid --control-addr")?,
        None => config.control_addr()?,
    };
    let media_addr = match args.media_addr.as_deref() {
        Some(s) => s.parse().context("invalid --media-addr")?,
        None => config.media_addr()?,
    };

    let server = Arc::new(
        sfu_core::Server::bind(control_addr, media_addr, config.server.default_room.clone())
            .await
            .with_context(|| format!("binding control={control_addr} media={media_addr}"))?,
    );

    tracing::info!(
        control_addr = %server.control_local_addr()?,
        media_addr = %server.media_local_addr()?,
        "sfu-server listening"
    );

    let run_handle = tokio::spawn(server.clone().run());

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    tracing::info!("shutdown signal received");
    server.shutdown();
    run_handle.await.context("server task panicked")?;

    Ok(())
}
