//! Newline-delimited JSON-RPC over stdin/stdout.
//!
//! Requests are handled concurrently, so a tool waiting on the plugin does
//! not block `ping` or REST tools. Responses are written in completion order.

use figma_mcp::server::codes;
use figma_mcp::{FigmaMcpServer, JsonRpcRequest, JsonRpcResponse};
use serde_json::Value;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::metrics::record_mcp_request;

/// Serve MCP until `reader` reaches EOF.
///
/// In-flight requests are finished and their responses written before
/// returning.
///
/// # Errors
///
/// Returns an I/O error when reading or writing fails.
pub async fn run_stdio<R, W>(server: FigmaMcpServer, reader: R, writer: &mut W) -> io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
    let mut tasks = JoinSet::new();
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_request(&line) {
                    Ok(request) => {
                        record_mcp_request(&request.method);
                        let server = server.clone();
                        let tx = tx.clone();
                        tasks.spawn(async move {
                            if let Some(response) = server.handle_request(request).await {
                                let _ = tx.send(response);
                            }
                        });
                    }
                    Err(response) => write_response(writer, &response).await?,
                }
            }
            Some(response) = rx.recv() => write_response(writer, &response).await?,
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!("MCP request task failed: {}", e);
                }
            }
        }
    }

    tracing::debug!("stdin closed, finishing {} in-flight requests", tasks.len());
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!("MCP request task failed: {}", e);
        }
    }
    drop(tx);
    while let Some(response) = rx.recv().await {
        write_response(writer, &response).await?;
    }
    Ok(())
}

fn parse_request(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        tracing::warn!("Unparsable MCP message: {}", e);
        JsonRpcResponse::error(Value::Null, codes::PARSE_ERROR, format!("Parse error: {e}"))
    })?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        JsonRpcResponse::error(id, codes::INVALID_REQUEST, format!("Invalid request: {e}"))
    })
}

async fn write_response<W>(writer: &mut W, response: &JsonRpcResponse) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response).map_err(io::Error::other)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use figma_core::{CommandRelay, RelayConfig};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, BufReader};

    async fn run(input: &str) -> Vec<Value> {
        let server = FigmaMcpServer::new(CommandRelay::default(), None);
        let mut output = Vec::new();
        run_stdio(server, BufReader::new(input.as_bytes()), &mut output)
            .await
            .expect("stdio loop");
        String::from_utf8(output)
            .expect("utf8")
            .lines()
            .map(|l| serde_json::from_str(l).expect("response is JSON"))
            .collect()
    }

    fn by_id(responses: &[Value], id: i64) -> &Value {
        responses
            .iter()
            .find(|r| r["id"] == id)
            .expect("response with id")
    }

    #[tokio::test]
    async fn answers_requests_and_skips_notifications() {
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        let responses = run(input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(by_id(&responses, 1)["result"]["protocolVersion"], "2024-11-05");
        assert!(by_id(&responses, 2)["result"].is_object());
    }

    #[tokio::test]
    async fn parse_errors_have_null_id() {
        let responses = run("this is not json\n").await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], codes::PARSE_ERROR);
    }

    #[tokio::test]
    async fn null_id_still_gets_an_answer() {
        let responses = run("{\"jsonrpc\":\"2.0\",\"id\":null,\"method\":\"ping\"}\n").await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], Value::Null);
        assert!(responses[0]["result"].is_object());
    }

    #[tokio::test]
    async fn invalid_requests_keep_their_id() {
        let responses = run("{\"jsonrpc\":\"2.0\",\"id\":9}\n").await;
        assert_eq!(responses[0]["id"], 9);
        assert_eq!(responses[0]["error"]["code"], codes::INVALID_REQUEST);
    }

    #[tokio::test]
    async fn slow_plugin_call_does_not_block_other_requests() {
        let relay = CommandRelay::new(RelayConfig::default().with_timeout(Duration::from_millis(300)));
        let (tx, _plugin_rx) = tokio::sync::mpsc::unbounded_channel();
        let handle = relay.register_connection(tx);
        relay.handle_message(&handle, r#"{"type":"figma-plugin-connected"}"#);
        let server = FigmaMcpServer::new(relay, None);

        let (mut client, server_io) = tokio::io::duplex(64 * 1024);
        let (server_read, mut server_write) = tokio::io::split(server_io);
        let task = tokio::spawn(async move {
            run_stdio(server, BufReader::new(server_read), &mut server_write).await
        });

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"get_selection"}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n",
        );
        tokio::io::AsyncWriteExt::write_all(&mut client, input.as_bytes())
            .await
            .expect("write");
        tokio::io::AsyncWriteExt::shutdown(&mut client).await.expect("shutdown");

        let mut output = String::new();
        client.read_to_string(&mut output).await.expect("read");
        task.await.expect("join").expect("stdio loop");

        let responses: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str(l).expect("json"))
            .collect();
        assert_eq!(responses.len(), 2);
        // The ping answers first; the plugin call waits for its timeout.
        assert_eq!(responses[0]["id"], 2);
        assert_eq!(responses[1]["id"], 1);
        assert_eq!(responses[1]["result"]["isError"], true);
        let text = responses[1]["result"]["content"][0]["text"]
            .as_str()
            .expect("text");
        assert!(text.contains("timed out"), "{text}");
    }
}
