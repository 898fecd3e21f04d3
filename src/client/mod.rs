// src/client/mod.rs

//! The public client surface and the actor behind it.
//!
//! A [`Client`] is a cheap, cloneable handle over the connection actor's
//! mailbox. Creation spawns the actor and kicks off the connect + login
//! handshake in the background; every later interaction is a command sent
//! into the mailbox and answered over a one-shot reply channel.

pub mod events;

pub(crate) mod core;
pub(crate) mod executor;
pub(crate) mod handshake;

use crate::config::ConnectionConfig;
use crate::error::VimError;
use crate::runtime::{Command, MailboxSender};
use crate::session::SessionInfo;
use crate::transport::endpoint::service_endpoint;
use crate::transport::{ITransportFactory, InvokeReply};
use self::events::{MonitorReceiver, DEFAULT_MONITOR_CAPACITY};

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::oneshot;

pub use self::core::{ConnectionState, MAX_RECONNECT_ATTEMPTS};

/// Operation names the client itself gives meaning to: the two handshake
/// calls and the logout operation whose completion ends the session. All
/// other operation names pass through opaquely.
pub mod operations {
  pub const RETRIEVE_SERVICE_CONTENT: &str = "RetrieveServiceContent";
  pub const LOGIN: &str = "Login";
  pub const LOGOUT: &str = "Logout";
  /// Well-known managed-object handle the service-content retrieval is
  /// addressed to.
  pub(crate) const SERVICE_INSTANCE: &str = "ServiceInstance";
}

/// Snapshot of the connection state and session attributes at one moment.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClientStatus {
  pub state: ConnectionState,
  /// Identity attributes of the authenticated session, if one is live.
  pub session: Option<SessionInfo>,
  /// Service-content structure retrieved during the handshake, if a session
  /// is live.
  pub service_content: Option<Value>,
  /// Automatic reconnection attempts since the last successful login.
  pub reconnect_attempts: u32,
}

/// The public handle for one logical session against a management endpoint.
/// Handles are cloneable and delegate all work to the connection actor.
#[derive(Clone)]
pub struct Client {
  mailbox: MailboxSender,
}

impl Client {
  /// Creates the client and immediately begins the connect + login
  /// handshake in the background. The returned handle is live before
  /// authentication completes; operations issued in the meantime queue and
  /// release once the session is ready.
  ///
  /// Fails eagerly if no service endpoint can be derived from the
  /// configured host.
  pub fn connect(
    config: ConnectionConfig,
    factory: Arc<dyn ITransportFactory>,
  ) -> Result<Client, VimError> {
    let endpoint = service_endpoint(&config.host)?;
    let (mailbox, _task_handle) = self::core::ClientCore::spawn(config, endpoint, factory);
    Ok(Client { mailbox })
  }

  /// Issues a named remote operation. Completes as soon as the operation is
  /// enqueued; the returned [`CommandHandle`] resolves exactly once with the
  /// outcome, after dispatch (and any transparent reconnect retries).
  ///
  /// `Value::Null` arguments are treated as an empty argument structure.
  pub async fn run_command(&self, operation: impl Into<String>, args: Value) -> CommandHandle {
    let (reply_tx, reply_rx) = oneshot::channel();
    let args = if args.is_null() {
      Value::Object(Default::default())
    } else {
      args
    };
    let command = Command::UserRun {
      operation: operation.into(),
      args,
      reply_tx,
    };
    if let Err(async_channel::SendError(command)) = self.mailbox.send(command).await {
      // Actor already stopped; resolve through the normal one-shot path so
      // the caller still observes exactly one outcome.
      if let Command::UserRun { reply_tx, .. } = command {
        let _ = reply_tx.send(Err(VimError::InvalidState("client is closed")));
      }
    }
    CommandHandle { reply_rx }
  }

  /// Snapshot of the connection state and session attributes.
  pub async fn status(&self) -> Result<ClientStatus, VimError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    self
      .mailbox
      .send(Command::UserStatus { reply_tx })
      .await
      .map_err(|_| VimError::InvalidState("client is closed"))?;
    reply_rx
      .await
      .map_err(|_| VimError::InvalidState("client is closed"))
  }

  /// Current connection state.
  pub async fn state(&self) -> Result<ConnectionState, VimError> {
    Ok(self.status().await?.state)
  }

  /// Identity attributes of the authenticated session, if one is live.
  pub async fn session(&self) -> Result<Option<SessionInfo>, VimError> {
    Ok(self.status().await?.session)
  }

  /// Registers a monitor channel for lifecycle events, replacing any
  /// previously registered one. Events emitted before registration are not
  /// replayed.
  pub async fn monitor(&self) -> Result<MonitorReceiver, VimError> {
    let (monitor_tx, monitor_rx) = async_channel::bounded(DEFAULT_MONITOR_CAPACITY);
    let (reply_tx, reply_rx) = oneshot::channel();
    self
      .mailbox
      .send(Command::UserMonitor {
        monitor_tx,
        reply_tx,
      })
      .await
      .map_err(|_| VimError::InvalidState("client is closed"))?;
    reply_rx
      .await
      .map_err(|_| VimError::InvalidState("client is closed"))?
      .map(|_| monitor_rx)
  }

  /// Graceful teardown. Logs out the live session on a best-effort basis,
  /// fails anything still queued, and stops the actor. Idempotent: closing
  /// an already-closed client is a no-op.
  pub async fn close(&self) -> Result<(), VimError> {
    let (reply_tx, reply_rx) = oneshot::channel();
    if self
      .mailbox
      .send(Command::UserClose { reply_tx })
      .await
      .is_err()
    {
      return Ok(());
    }
    match reply_rx.await {
      Ok(result) => result,
      Err(_) => Ok(()),
    }
  }
}

impl fmt::Debug for Client {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Client").finish_non_exhaustive()
  }
}

/// One-shot observable for the outcome of a single remote operation.
/// Exactly one of success or failure is observed, exactly once.
#[derive(Debug)]
pub struct CommandHandle {
  reply_rx: oneshot::Receiver<Result<InvokeReply, VimError>>,
}

impl CommandHandle {
  /// Waits for the operation outcome. No timeout is applied at this layer;
  /// wrap the future in `tokio::time::timeout` if one is needed.
  pub async fn wait(self) -> Result<InvokeReply, VimError> {
    match self.reply_rx.await {
      Ok(outcome) => outcome,
      Err(_) => Err(VimError::InvalidState(
        "client stopped before the operation resolved",
      )),
    }
  }
}
