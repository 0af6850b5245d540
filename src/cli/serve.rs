// src/cli/serve.rs — `velle serve`: MCP server on stdio, optional sidecar

use crate::api::{self, ApiState};
use crate::core::Governor;
use crate::infra::config::Config;
use crate::mcp::McpServer;

/// Run until the MCP client closes stdin or the process gets Ctrl-C.
pub async fn run_serve(mut config: Config, sidecar: bool, dry_run: bool) -> anyhow::Result<()> {
    if sidecar {
        config.sidecar.enabled = true;
    }
    let governor = Governor::from_config(config, dry_run)?;
    let sidecar_config = governor.config().sidecar.clone();

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let sidecar_task = if sidecar_config.enabled {
        let state = ApiState {
            governor: governor.clone(),
            token: sidecar_config.token.clone(),
        };
        let shutdown = async move {
            let _ = shutdown_rx.await;
        };
        Some(tokio::spawn(async move {
            if let Err(e) = api::start_sidecar(&sidecar_config, state, shutdown).await {
                tracing::error!("HTTP sidecar stopped: {}", e);
            }
        }))
    } else {
        None
    };

    let server = McpServer::new(governor.clone());
    tracing::info!("velle MCP server starting on stdio");

    tokio::select! {
        result = server.serve(tokio::io::stdin(), tokio::io::stdout()) => {
            if let Err(e) = result {
                tracing::error!("MCP transport error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
        }
    }

    governor.shutdown();
    let _ = shutdown_tx.send(());
    if let Some(task) = sidecar_task {
        let _ = task.await;
    }
    Ok(())
}
