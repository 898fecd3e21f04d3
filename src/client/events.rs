// src/client/events.rs

/// Significant lifecycle events of a client connection, delivered on the
/// monitor channel. Errors are carried as strings so events stay `Clone`.
#[derive(Debug, Clone)]
#[non_exhaustive] // Allow adding more events later
pub enum ClientEvent {
  /// The connect + login handshake started against the endpoint.
  Connecting { endpoint: String },
  /// Login completed; the session is established and queued operations are
  /// being released.
  Ready { user_name: String, full_name: String },
  /// Connect or login failed; the client is back to disconnected.
  HandshakeFailed { endpoint: String, error_msg: String },
  /// The server invalidated the session underneath a dispatched operation.
  SessionExpired { operation: String },
  /// An automatic reconnect attempt is starting. `attempt` counts attempts
  /// since the last successful login.
  Reconnecting { attempt: u32 },
  /// The session ended (logout, expiry, or teardown).
  Disconnected,
  /// The client actor stopped; no further events follow.
  Closed,
}

/// Sender end of the monitor channel.
pub type MonitorSender = async_channel::Sender<ClientEvent>;
/// Receiver end of the monitor channel.
pub type MonitorReceiver = async_channel::Receiver<ClientEvent>;

/// Default capacity for monitor channels created by `Client::monitor`.
pub const DEFAULT_MONITOR_CAPACITY: usize = 100;
