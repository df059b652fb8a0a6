// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use anyhow::{Context, Result};
use muxrpc_client_rs::cfg::{cli::resolve_config_path, config::Config, logger::init_logger};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Application-defined dispatch key for the demo `echo` method; a real
/// deployment would share a method registry with its server.
const METHOD_ECHO: u32 = 1;

#[derive(Debug, Serialize)]
struct EchoRequest {
    message: String,
}

#[derive(Debug, Deserialize)]
struct EchoResponse {
    message: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = resolve_config_path("config/cluster.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let _guard = init_logger(cfg.logger.as_deref().unwrap_or("tests/config_logger.yaml"))?;

    let cluster = muxrpc_client_rs::cluster::Cluster::dial(
        cfg.cluster.remotes.clone(),
        cfg.client_config(),
    )
    .await
    .context("failed to dial cluster")?;
    info!(
        remotes = ?cluster.status().await,
        "cluster dialed"
    );

    let resp: EchoResponse = cluster
        .call(
            METHOD_ECHO,
            &EchoRequest {
                message: "hello".into(),
            },
        )
        .await
        .context("echo call failed")?;
    info!(reply = %resp.message, "echo round-trip complete");

    cluster.close().await.context("failed to close cluster")?;
    Ok(())
}
