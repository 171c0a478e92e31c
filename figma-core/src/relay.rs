//! # Command Relay
//!
//! Request/response over a push-only, single-connection transport.
//!
//! ## Connection state
//!
//! ```text
//! DISCONNECTED --(figma-plugin-connected)--> CONNECTED
//! CONNECTED --(close of active handle)--> DISCONNECTED
//! CONNECTED --(handshake on another handle)--> CONNECTED (handle replaced)
//! ```
//!
//! ## Pending commands
//!
//! Every `send_command` call owns a ticket in `in_flight`. Responses reach a
//! ticket through `routes`, keyed by the correlation key: the command name
//! (legacy mode) or a per-call request id. In command-name mode a second call
//! with the same name takes over the route; the first call can then only end
//! by its own timeout (or connection loss).
//!
//! Each call ends exactly once, on the first of: matching response, timeout,
//! loss of the connection it was sent on.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::error::{RelayError, RelayResult};
use crate::protocol::{OutboundCommand, PluginMessage, PluginResponse};

/// Default time a command waits for the plugin.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Identifier of one plugin transport connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// How plugin responses are matched to pending commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrelationMode {
    /// Match on the command name. Concurrent calls with the same name
    /// overwrite each other's route; the earlier call times out.
    #[default]
    CommandName,
    /// Attach a unique `id` to every command and match on the echoed `id`.
    RequestId,
}

/// Relay tuning.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// How long a command waits for its response.
    pub command_timeout: Duration,
    /// Response correlation strategy.
    pub correlation: CorrelationMode,
    /// Reject in-flight commands as soon as their connection closes instead
    /// of letting them run into the timeout.
    pub fail_pending_on_disconnect: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            correlation: CorrelationMode::CommandName,
            fail_pending_on_disconnect: true,
        }
    }
}

impl RelayConfig {
    /// Override the command timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Override the correlation mode.
    #[must_use]
    pub fn with_correlation(mut self, correlation: CorrelationMode) -> Self {
        self.correlation = correlation;
        self
    }

    /// Choose whether a closed connection fails its in-flight commands.
    #[must_use]
    pub fn with_fail_pending_on_disconnect(mut self, enabled: bool) -> Self {
        self.fail_pending_on_disconnect = enabled;
        self
    }
}

/// One registered transport connection.
///
/// Frames queued on the outbound channel are written to the socket by the
/// transport task that owns the receiving end.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    /// Connection id.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

/// What the relay did with an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Handshake; the sending connection is now active.
    PluginConnected,
    /// A pending command was resolved.
    Resolved,
    /// A response with no pending command (late, duplicate or unknown).
    Unmatched,
    /// Well-formed message of a type the relay does not handle.
    Ignored,
    /// Not JSON, or a known type with invalid fields.
    Malformed,
}

impl MessageOutcome {
    /// Short label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PluginConnected => "plugin_connected",
            Self::Resolved => "resolved",
            Self::Unmatched => "unmatched",
            Self::Ignored => "ignored",
            Self::Malformed => "malformed",
        }
    }
}

/// Counters since the relay was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RelayStats {
    /// Commands written to a plugin connection.
    pub commands_sent: u64,
    /// Commands resolved by a plugin response.
    pub responses_resolved: u64,
    /// Commands that hit the timeout.
    pub timeouts: u64,
    /// Commands rejected because their connection closed.
    pub connection_failures: u64,
    /// Responses that matched nothing.
    pub unmatched_responses: u64,
    /// Frames that could not be parsed.
    pub malformed_messages: u64,
}

type Responder = oneshot::Sender<RelayResult<PluginResponse>>;

struct InFlight {
    key: String,
    command: String,
    connection: ConnectionId,
    respond: Responder,
}

#[derive(Default)]
struct RelayState {
    active: Option<ConnectionHandle>,
    in_flight: HashMap<u64, InFlight>,
    routes: HashMap<String, u64>,
}

impl RelayState {
    /// Remove a ticket, and its route if the route still points at it.
    fn remove_ticket(&mut self, ticket: u64) -> Option<InFlight> {
        let entry = self.in_flight.remove(&ticket)?;
        if self.routes.get(&entry.key) == Some(&ticket) {
            self.routes.remove(&entry.key);
        }
        Some(entry)
    }

    fn take_routed(&mut self, key: &str) -> Option<InFlight> {
        let ticket = self.routes.remove(key)?;
        self.in_flight.remove(&ticket)
    }
}

#[derive(Default)]
struct Counters {
    commands_sent: AtomicU64,
    responses_resolved: AtomicU64,
    timeouts: AtomicU64,
    connection_failures: AtomicU64,
    unmatched_responses: AtomicU64,
    malformed_messages: AtomicU64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

struct RelayInner {
    config: RelayConfig,
    state: Mutex<RelayState>,
    next_connection: AtomicU64,
    next_ticket: AtomicU64,
    counters: Counters,
}

impl RelayInner {
    fn state(&self) -> MutexGuard<'_, RelayState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::error!("Relay state lock poisoned; continuing with inner state");
                poisoned.into_inner()
            }
        }
    }
}

/// Removes the caller's ticket when `send_command` returns or is dropped.
struct TicketGuard<'a> {
    inner: &'a RelayInner,
    ticket: u64,
}

impl Drop for TicketGuard<'_> {
    fn drop(&mut self) {
        self.inner.state().remove_ticket(self.ticket);
    }
}

/// Relay between MCP tool handlers and the Figma plugin.
///
/// Cheap to clone; all clones share the same connection slot and pending set.
#[derive(Clone)]
pub struct CommandRelay {
    inner: Arc<RelayInner>,
}

impl CommandRelay {
    /// Create a relay with no active connection.
    #[must_use]
    pub fn new(config: RelayConfig) -> Self {
        Self {
            inner: Arc::new(RelayInner {
                config,
                state: Mutex::new(RelayState::default()),
                next_connection: AtomicU64::new(1),
                next_ticket: AtomicU64::new(1),
                counters: Counters::default(),
            }),
        }
    }

    /// Relay configuration.
    #[must_use]
    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    /// Register a newly opened transport connection.
    ///
    /// The connection is not active until it sends the handshake.
    pub fn register_connection(&self, outbound: mpsc::UnboundedSender<String>) -> ConnectionHandle {
        let id = ConnectionId(self.inner.next_connection.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(connection = %id, "New plugin transport connection");
        ConnectionHandle { id, outbound }
    }

    /// Process one inbound text frame from `handle`.
    ///
    /// Never fails: unparseable frames are logged and counted.
    pub fn handle_message(&self, handle: &ConnectionHandle, payload: &str) -> MessageOutcome {
        let message = match serde_json::from_str::<PluginMessage>(payload) {
            Ok(message) => message,
            Err(e) => {
                bump(&self.inner.counters.malformed_messages);
                tracing::warn!(connection = %handle.id, "Error processing plugin message: {}", e);
                return MessageOutcome::Malformed;
            }
        };

        match message {
            PluginMessage::Connected { plugin_id } => {
                let previous = self.inner.state().active.replace(handle.clone());
                if let Some(previous) = previous.filter(|p| p.id != handle.id) {
                    tracing::info!(
                        connection = %handle.id,
                        previous = %previous.id,
                        "Plugin handshake supersedes the previous connection"
                    );
                }
                tracing::info!(
                    connection = %handle.id,
                    plugin_id = plugin_id.as_deref().unwrap_or("unknown"),
                    "Figma plugin connected"
                );
                MessageOutcome::PluginConnected
            }
            PluginMessage::Response {
                command,
                id,
                success,
                result,
                error,
            } => {
                let key = match self.inner.config.correlation {
                    CorrelationMode::CommandName => Some(command.as_str()),
                    CorrelationMode::RequestId => id.as_deref(),
                };
                // Deliver under the lock: a caller whose timer fires finds
                // either its ticket or the response already in the channel.
                let delivered = key.is_some_and(|key| {
                    let mut state = self.inner.state();
                    let Some(entry) = state.take_routed(key) else {
                        return false;
                    };
                    // The caller may have gone away; nothing to do then.
                    let _ = entry.respond.send(Ok(PluginResponse {
                        success,
                        result,
                        error,
                    }));
                    true
                });

                if !delivered {
                    bump(&self.inner.counters.unmatched_responses);
                    tracing::debug!(
                        connection = %handle.id,
                        command = %command,
                        request_id = id.as_deref().unwrap_or("-"),
                        "Dropping plugin response with no pending command"
                    );
                    return MessageOutcome::Unmatched;
                }

                bump(&self.inner.counters.responses_resolved);
                tracing::debug!(command = %command, success, "Plugin response received");
                MessageOutcome::Resolved
            }
            PluginMessage::Unknown => {
                tracing::debug!(connection = %handle.id, "Ignoring plugin message of unknown type");
                MessageOutcome::Ignored
            }
        }
    }

    /// Tell the relay that `handle`'s transport closed.
    ///
    /// Clears the active slot if `handle` is the active connection. Safe to
    /// call more than once.
    pub fn connection_closed(&self, handle: &ConnectionHandle) {
        let mut state = self.inner.state();
        if state.active.as_ref().is_some_and(|a| a.id == handle.id) {
            state.active = None;
            tracing::info!(connection = %handle.id, "Active Figma plugin connection closed");
        } else {
            tracing::debug!(connection = %handle.id, "Plugin transport connection closed");
        }

        if !self.inner.config.fail_pending_on_disconnect {
            return;
        }

        let tickets: Vec<u64> = state
            .in_flight
            .iter()
            .filter(|(_, f)| f.connection == handle.id)
            .map(|(ticket, _)| *ticket)
            .collect();
        for entry in tickets
            .into_iter()
            .filter_map(|ticket| state.remove_ticket(ticket))
        {
            bump(&self.inner.counters.connection_failures);
            tracing::warn!(command = %entry.command, "Failing in-flight command: connection closed");
            let _ = entry.respond.send(Err(RelayError::ConnectionClosed {
                command: entry.command,
            }));
        }
    }

    /// Send `command` to the active plugin and wait for its response.
    ///
    /// # Errors
    ///
    /// - [`RelayError::NoConnection`] immediately when no plugin is connected.
    /// - [`RelayError::Timeout`] when no response arrives in time.
    /// - [`RelayError::ConnectionClosed`] when the connection drops first.
    /// - [`RelayError::Serialization`] when the command cannot be encoded.
    ///
    /// A response with `success: false` is returned as `Ok`; use
    /// [`PluginResponse::into_result`] to turn it into an error.
    pub async fn send_command(&self, command: &str, params: Value) -> RelayResult<PluginResponse> {
        let request_id = match self.inner.config.correlation {
            CorrelationMode::CommandName => None,
            CorrelationMode::RequestId => Some(Uuid::new_v4().to_string()),
        };
        let payload = serde_json::to_string(&OutboundCommand::new(
            command,
            &params,
            request_id.as_deref(),
        ))?;
        let key = request_id.unwrap_or_else(|| command.to_string());
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        let (tx, mut rx) = oneshot::channel();

        {
            let mut state = self.inner.state();
            let Some(active) = state.active.clone() else {
                return Err(RelayError::NoConnection);
            };

            if let Some(previous) = state.routes.insert(key.clone(), ticket) {
                tracing::warn!(
                    command = %command,
                    previous_ticket = previous,
                    "Pending command with the same name replaced; the earlier call will time out"
                );
            }
            state.in_flight.insert(
                ticket,
                InFlight {
                    key,
                    command: command.to_string(),
                    connection: active.id,
                    respond: tx,
                },
            );

            if active.outbound.send(payload).is_err() {
                state.remove_ticket(ticket);
                return Err(RelayError::ConnectionClosed {
                    command: command.to_string(),
                });
            }
        }

        bump(&self.inner.counters.commands_sent);
        tracing::debug!(command = %command, ticket, "Command sent to Figma plugin");

        let _guard = TicketGuard {
            inner: &self.inner,
            ticket,
        };

        match tokio::time::timeout(self.inner.config.command_timeout, &mut rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(RelayError::ConnectionClosed {
                command: command.to_string(),
            }),
            Err(_) => {
                if self.inner.state().remove_ticket(ticket).is_none() {
                    // Resolved between the timer firing and taking the lock.
                    if let Ok(result) = rx.try_recv() {
                        return result;
                    }
                }
                bump(&self.inner.counters.timeouts);
                tracing::warn!(
                    command = %command,
                    timeout_ms = u64::try_from(self.inner.config.command_timeout.as_millis())
                        .unwrap_or(u64::MAX),
                    "Command timed out waiting for Figma plugin"
                );
                Err(RelayError::Timeout {
                    command: command.to_string(),
                })
            }
        }
    }

    /// Whether a plugin connection is currently active.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.state().active.is_some()
    }

    /// Id of the active connection, if any.
    #[must_use]
    pub fn active_connection(&self) -> Option<ConnectionId> {
        self.inner.state().active.as_ref().map(ConnectionHandle::id)
    }

    /// Number of calls currently waiting (routed or superseded).
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.state().in_flight.len()
    }

    /// Snapshot of the relay counters.
    #[must_use]
    pub fn stats(&self) -> RelayStats {
        let c = &self.inner.counters;
        RelayStats {
            commands_sent: c.commands_sent.load(Ordering::Relaxed),
            responses_resolved: c.responses_resolved.load(Ordering::Relaxed),
            timeouts: c.timeouts.load(Ordering::Relaxed),
            connection_failures: c.connection_failures.load(Ordering::Relaxed),
            unmatched_responses: c.unmatched_responses.load(Ordering::Relaxed),
            malformed_messages: c.malformed_messages.load(Ordering::Relaxed),
        }
    }
}

impl Default for CommandRelay {
    fn default() -> Self {
        Self::new(RelayConfig::default())
    }
}

impl fmt::Debug for CommandRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRelay")
            .field("config", &self.inner.config)
            .field("active_connection", &self.active_connection())
            .field("pending", &self.pending_count())
            .finish()
    }
}
