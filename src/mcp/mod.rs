// src/mcp/mod.rs — MCP tool server (newline-delimited JSON-RPC over stdio)
//
// stdout belongs to the protocol; all logging goes to stderr.

pub mod protocol;
pub mod tools;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::core::Governor;
use protocol::{RpcMessage, INVALID_PARAMS, METHOD_NOT_FOUND, PROTOCOL_VERSION};

pub struct McpServer {
    governor: Governor,
}

impl McpServer {
    pub fn new(governor: Governor) -> Self {
        Self { governor }
    }

    /// Serve until the reader hits EOF. Each request is handled on its own
    /// task so `velle_status` answers while a delivery is waiting.
    pub async fn serve<R, W>(self, reader: R, writer: W) -> anyhow::Result<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Value>(64);

        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(msg) = rx.recv().await {
                let mut line = msg.to_string();
                line.push('\n');
                writer.write_all(line.as_bytes()).await?;
                writer.flush().await?;
            }
            Ok::<_, std::io::Error>(())
        });

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let governor = self.governor.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = handle_line(&governor, &line).await {
                    if tx.send(response).await.is_err() {
                        tracing::debug!("MCP writer closed before response was sent");
                    }
                }
            });
        }
        tracing::info!("MCP client closed stdin");

        drop(tx);
        writer_task.await??;
        Ok(())
    }
}

/// Handle one line of input. Returns `None` for notifications.
pub async fn handle_line(governor: &Governor, line: &str) -> Option<Value> {
    match protocol::parse(line) {
        Ok(msg) => handle_message(governor, msg).await,
        Err(response) => Some(response),
    }
}

pub async fn handle_message(governor: &Governor, msg: RpcMessage) -> Option<Value> {
    if msg.is_notification() {
        tracing::debug!("MCP notification: {}", msg.method);
        return None;
    }
    let id = msg.id.clone().unwrap_or(Value::Null);
    let params = msg.params.unwrap_or(Value::Null);

    let response = match msg.method.as_str() {
        "initialize" => protocol::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": { "listChanged": false } },
                "serverInfo": { "name": "velle", "version": env!("CARGO_PKG_VERSION") },
            }),
        ),
        "ping" => protocol::success(id, json!({})),
        "tools/list" => {
            let defs = tools::definitions(&governor.command_catalog());
            protocol::success(id, json!({ "tools": defs }))
        }
        "tools/call" => {
            let Some(name) = params.get("name").and_then(Value::as_str) else {
                return Some(protocol::error(id, INVALID_PARAMS, "tools/call requires a name"));
            };
            let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
            tracing::debug!("Tool call: {}", name);
            let output = tools::call(governor, name, arguments).await;
            protocol::success(id, output.into_result())
        }
        other => protocol::error(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
    };
    Some(response)
}
