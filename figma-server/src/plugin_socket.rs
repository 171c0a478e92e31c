//! One Figma plugin WebSocket, pumped into and out of the relay.

use axum::extract::ws::{Message, WebSocket};
use figma_core::{CommandRelay, ConnectionHandle};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::metrics::{
    dec_ws_connections, inc_ws_connections, record_validation_failure, record_ws_message,
};
use crate::validation::{decode_binary_frame, validate_message_size};

/// Serve a plugin socket until it closes.
///
/// Inbound text goes to [`CommandRelay::handle_message`]; commands the relay
/// queues for this connection are written out as text frames. The relay is
/// told about the close however the loop ends.
pub async fn handle_plugin_socket(socket: WebSocket, relay: CommandRelay) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
    let handle = relay.register_connection(outbound_tx);
    let connection = handle.id();
    inc_ws_connections();
    tracing::info!(connection = %connection, "Plugin socket opened");

    loop {
        tokio::select! {
            // Frames from the plugin
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => inbound(&relay, &handle, text.as_str()),
                    Some(Ok(Message::Binary(bytes))) => match decode_binary_frame(&bytes) {
                        Ok(text) => inbound(&relay, &handle, text),
                        Err(e) => {
                            tracing::warn!(connection = %connection, "Binary frame rejected: {}", e);
                            record_validation_failure("binary_frame");
                        }
                    },
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(connection = %connection, "Plugin disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::error!(connection = %connection, "WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                    // Ping/pong are answered by axum
                    Some(Ok(_)) => {}
                }
            }

            // Commands from the relay
            command = outbound_rx.recv() => {
                let Some(text) = command else { break };
                if let Err(e) = sender.send(Message::Text(text.into())).await {
                    tracing::error!(connection = %connection, "Failed to write command: {}", e);
                    break;
                }
                record_ws_message("outbound", "command");
            }
        }
    }

    relay.connection_closed(&handle);
    dec_ws_connections();
    tracing::info!(connection = %connection, "Plugin socket closed");
}

fn inbound(relay: &CommandRelay, handle: &ConnectionHandle, text: &str) {
    if let Err(e) = validate_message_size(text.len()) {
        tracing::warn!(connection = %handle.id(), "Message rejected: {}", e);
        record_validation_failure("message_size");
        return;
    }
    let outcome = relay.handle_message(handle, text);
    record_ws_message("inbound", outcome.as_str());
}
