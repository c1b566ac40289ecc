//! Stdio tool server.
//!
//! Reads one JSON-RPC message per line, handles each in its own task and
//! funnels every response through a single writer task so frames never
//! interleave on stdout.

use crate::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolCallParams, PROTOCOL_VERSION};
use rm_gateway::ToolSet;
use serde_json::{json, Value};
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub const SERVER_NAME: &str = "rm-agent";

pub struct ToolServer {
    tools: ToolSet,
}

impl ToolServer {
    pub fn new(tools: ToolSet) -> Self {
        Self { tools }
    }

    pub fn tools(&self) -> &ToolSet {
        &self.tools
    }

    /// Handle one raw line; `None` for notifications
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    Value::Null,
                    JsonRpcError::parse_error(e.to_string()),
                ))
            }
        };

        let id = value.get("id").cloned().unwrap_or(Value::Null);
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    id,
                    JsonRpcError::invalid_request(e.to_string()),
                ))
            }
        };
        if request.jsonrpc != crate::protocol::JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!(
                    "unsupported jsonrpc version '{}'",
                    request.jsonrpc
                )),
            ));
        }

        self.handle(request).await
    }

    /// Dispatch a parsed request
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            debug!(method = %request.method, "Notification received");
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, initialize_result()),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                JsonRpcResponse::success(id, json!({ "tools": self.tools.definitions() }))
            }
            "tools/call" => match serde_json::from_value::<ToolCallParams>(request.params) {
                Ok(params) => JsonRpcResponse::success(id, self.call_tool(params).await),
                Err(e) => JsonRpcResponse::error(id, JsonRpcError::invalid_params(e.to_string())),
            },
            other => JsonRpcResponse::error(id, JsonRpcError::method_not_found(other)),
        };
        Some(response)
    }

    async fn call_tool(&self, params: ToolCallParams) -> Value {
        let outcome = self.tools.call(&params.name, params.arguments).await;
        let payload = outcome.to_value();
        let text = serde_json::to_string_pretty(&payload).unwrap_or_else(|_| payload.to_string());
        json!({
            "content": [{ "type": "text", "text": text }],
            "structuredContent": payload,
            "isError": outcome.is_error(),
        })
    }

    /// Serve until `reader` reaches EOF and every in-flight call has answered
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        let writer_task = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(frame) = rx.recv().await {
                writer.write_all(frame.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
            writer.shutdown().await
        });

        let mut lines = reader.lines();
        let mut received = 0u64;
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            received += 1;

            // Each task holds a sender; the writer drains until the last one drops
            let server = Arc::clone(&self);
            let tx = tx.clone();
            tokio::spawn(async move {
                let Some(response) = server.handle_line(&line).await else {
                    return;
                };
                match serde_json::to_string(&response) {
                    Ok(frame) => {
                        if tx.send(frame).is_err() {
                            error!("Writer closed before response was sent");
                        }
                    }
                    Err(e) => error!(error = %e, "Failed to serialize response"),
                }
            });
        }

        info!(messages = received, "Input closed, draining in-flight calls");
        drop(tx);
        writer_task.await.map_err(io::Error::other)?
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
    })
}
