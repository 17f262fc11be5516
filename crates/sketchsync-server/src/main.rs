//! SketchSync server
//!
//! Accepts editor connections on TCP (port 4242 by default) and keeps every
//! editor's sketch in step with the canonical one.
//!
//! ## Protocol
//!
//! Each command is two newline-terminated lines, a verb and its payload:
//!
//! ```text
//! DRAW
//! rectangle 10 10 50 40 -16776961
//! ```
//!
//! After every command the server sends the whole sketch to all clients:
//!
//! ```text
//! Shapes are:
//! 0	rectangle 10 10 50 40 -16776961
//! end
//! ```

use anyhow::Context;
use clap::Parser;
use sketchsync_server::{ServerConfig, SketchServer};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sketchsync_server=info".into()),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ServerConfig::parse();
    tracing::debug!(?config, "starting");

    let server = SketchServer::bind(config)
        .await
        .context("could not start sketch server")?;
    server.run().await.context("sketch server stopped")?;
    Ok(())
}
