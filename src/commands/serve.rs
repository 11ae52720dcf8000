//! `serve`: expose the local pipeline over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::api;
use crate::config::Config;
use crate::pipeline::LocalPipeline;

pub async fn run(config: &Config, addr: Option<&str>) -> Result<()> {
    let raw = addr.unwrap_or(&config.server_addr);
    let addr: SocketAddr = raw
        .parse()
        .with_context(|| format!("invalid listen address: {}", raw))?;

    let pipeline = LocalPipeline::from_config(config)?;
    info!(%addr, "Starting dataset chat API");
    api::serve(addr, Arc::new(pipeline)).await
}
