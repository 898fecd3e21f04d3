// src/runtime/command.rs

use crate::client::events::MonitorSender;
use crate::client::handshake::HandshakeOutcome;
use crate::client::ClientStatus;
use crate::error::VimError;
use crate::transport::InvokeReply;

use serde_json::Value;
use tokio::sync::oneshot; // Using tokio's oneshot for replies

/// Reply channel for a single dispatched operation. The one-shot channel is
/// what makes command resolution exactly-once: the sender is consumed by the
/// first (and only) resolution, and dropping it unresolved surfaces as an
/// error on the receiving handle.
pub(crate) type ReplySender = oneshot::Sender<Result<InvokeReply, VimError>>;

/// Messages exchanged between the public `Client` handle and the connection
/// actor, plus internal completion notifications from spawned tasks.
#[derive(Debug)]
pub(crate) enum Command {
  // --- User Requests (from Client handle -> actor mailbox) ---
  /// Execute a named remote operation against the authenticated session.
  UserRun {
    operation: String,
    args: Value,
    reply_tx: ReplySender,
  },
  /// Snapshot the connection state and session attributes.
  UserStatus {
    reply_tx: oneshot::Sender<ClientStatus>,
  },
  /// Register the monitor channel for lifecycle events.
  UserMonitor {
    monitor_tx: MonitorSender,
    reply_tx: oneshot::Sender<Result<(), VimError>>,
  },
  /// Begin teardown: best-effort logout, then stop the actor.
  UserClose {
    reply_tx: oneshot::Sender<Result<(), VimError>>,
  },

  // --- Internal Notifications (spawned tasks -> actor mailbox) ---
  /// Completion report from the handshake task. At most one handshake runs
  /// at a time, so at most one of these can be in flight.
  HandshakeFinished {
    result: Result<HandshakeOutcome, VimError>,
  },
}

impl Command {
  /// Returns the command variant's name. Useful for logging.
  pub(crate) fn variant_name(&self) -> &'static str {
    match self {
      Command::UserRun { .. } => "UserRun",
      Command::UserStatus { .. } => "UserStatus",
      Command::UserMonitor { .. } => "UserMonitor",
      Command::UserClose { .. } => "UserClose",
      Command::HandshakeFinished { .. } => "HandshakeFinished",
    }
  }
}
