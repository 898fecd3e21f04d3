// src/client/core.rs

//! The connection actor: owns the state machine, the session, the pending
//! queue, and the reconnect bookkeeping. All mutation happens on this one
//! task, so state transitions are serialized by construction.

use crate::client::events::{ClientEvent, MonitorSender};
use crate::client::executor::CommandExecutor;
use crate::client::handshake::{Handshake, HandshakeOutcome};
use crate::client::operations::LOGOUT;
use crate::client::ClientStatus;
use crate::config::ConnectionConfig;
use crate::error::VimError;
use crate::runtime::{mailbox, Command, MailboxReceiver, MailboxSender, ReplySender};
use crate::session::Session;
use crate::transport::{ITransport, ITransportFactory};

use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use url::Url;

/// Upper bound on automatic reconnection attempts. Reaching it resolves the
/// affected operation with [`VimError::ReconnectExhausted`] instead of
/// reconnecting again.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Source of per-client handles used in log output.
static NEXT_CLIENT_HANDLE: AtomicUsize = AtomicUsize::new(1);

/// Connection lifecycle state. Owned exclusively by the actor; the client
/// cycles `Disconnected -> Connecting -> Ready -> Disconnected` indefinitely,
/// there is no terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum ConnectionState {
  /// No session; the next command triggers a handshake.
  Disconnected,
  /// A handshake is in flight; commands queue until it settles.
  Connecting,
  /// Session established; commands dispatch immediately.
  Ready,
}

/// A queued operation waiting for the session to become ready, together with
/// its reply channel and retry bookkeeping. Consumed exactly once.
#[derive(Debug)]
pub(crate) struct PendingCommand {
  pub operation: String,
  pub args: Value,
  pub reply_tx: ReplySender,
  /// Reconnects this particular command has already caused. The per-command
  /// count is what keeps the retry bound intact across successful
  /// intermediate logins.
  pub attempts: u32,
}

/// The actor state. Created by [`ClientCore::spawn`] and owned by the actor
/// task for its whole life.
pub(crate) struct ClientCore {
  handle: usize,
  config: ConnectionConfig,
  endpoint: Url,
  factory: Arc<dyn ITransportFactory>,
  /// Clone of the actor's own mailbox sender, handed to handshake tasks so
  /// they can report completion.
  mailbox_sender: MailboxSender,
  state: ConnectionState,
  transport: Option<Arc<dyn ITransport>>,
  session: Option<Session>,
  pending: VecDeque<PendingCommand>,
  /// Automatic reconnection attempts since the last successful login.
  reconnect_attempts: u32,
  monitor_tx: Option<MonitorSender>,
}

impl ClientCore {
  /// Creates the actor and spawns its command loop. The initial handshake
  /// starts immediately; the returned mailbox is live before it completes.
  pub(crate) fn spawn(
    config: ConnectionConfig,
    endpoint: Url,
    factory: Arc<dyn ITransportFactory>,
  ) -> (MailboxSender, JoinHandle<()>) {
    let (mailbox_sender, mailbox_receiver) = mailbox(crate::runtime::DEFAULT_MAILBOX_CAPACITY);
    let core = ClientCore {
      handle: NEXT_CLIENT_HANDLE.fetch_add(1, Ordering::Relaxed),
      config,
      endpoint,
      factory,
      mailbox_sender: mailbox_sender.clone(),
      state: ConnectionState::Disconnected,
      transport: None,
      session: None,
      pending: VecDeque::new(),
      reconnect_attempts: 0,
      monitor_tx: None,
    };
    let task_handle = tokio::spawn(core.run_command_loop(mailbox_receiver));
    (mailbox_sender, task_handle)
  }

  async fn run_command_loop(mut self, receiver: MailboxReceiver) {
    tracing::debug!(
      handle = self.handle,
      host = %self.config.host,
      "client actor started"
    );

    // Creation begins the connect handshake without waiting for the first
    // command.
    self.trigger_handshake();

    loop {
      let command = match receiver.recv().await {
        Ok(command) => command,
        Err(_) => {
          // Every public handle dropped without close(); queued reply
          // senders are dropped below, which resolves their handles with a
          // stopped-client error.
          tracing::debug!(handle = self.handle, "client mailbox closed, stopping actor");
          break;
        }
      };

      tracing::trace!(
        handle = self.handle,
        command = command.variant_name(),
        state = ?self.state,
        "client actor received command"
      );

      match command {
        Command::UserRun {
          operation,
          args,
          reply_tx,
        } => {
          self
            .handle_run(PendingCommand {
              operation,
              args,
              reply_tx,
              attempts: 0,
            })
            .await;
        }
        Command::UserStatus { reply_tx } => {
          let _ = reply_tx.send(self.status());
        }
        Command::UserMonitor {
          monitor_tx,
          reply_tx,
        } => {
          self.monitor_tx = Some(monitor_tx);
          let _ = reply_tx.send(Ok(()));
        }
        Command::UserClose { reply_tx } => {
          self.teardown().await;
          let _ = reply_tx.send(Ok(()));
          break;
        }
        Command::HandshakeFinished { result } => {
          self.handle_handshake_finished(result).await;
        }
      }
    }

    tracing::debug!(handle = self.handle, "client actor stopped");
  }

  /// Routes a freshly issued operation according to the current state.
  async fn handle_run(&mut self, command: PendingCommand) {
    match self.state {
      ConnectionState::Ready => self.dispatch(command).await,
      ConnectionState::Connecting => {
        // A handshake is already in flight; the command joins the queue and
        // is released on the transition to Ready.
        self.pending.push_back(command);
      }
      ConnectionState::Disconnected => {
        self.pending.push_back(command);
        self.trigger_handshake();
      }
    }
  }

  /// Dispatches one operation against the bound transport and classifies
  /// the outcome. On session expiry the command is re-queued with its
  /// original reply channel so the retry stays invisible to the caller.
  async fn dispatch(&mut self, mut command: PendingCommand) {
    let transport = match &self.transport {
      Some(transport) => transport.clone(),
      None => {
        let _ = command
          .reply_tx
          .send(Err(VimError::Internal("ready state without a transport".into())));
        return;
      }
    };

    let outcome = CommandExecutor::new(transport)
      .execute(&command.operation, &command.args)
      .await;

    // Logout ends the session no matter how the call went: on failure the
    // server-side session is presumed gone anyway.
    if command.operation == LOGOUT {
      self.drop_session("logout");
      let _ = command.reply_tx.send(outcome);
      return;
    }

    match outcome {
      Ok(reply) => {
        let _ = command.reply_tx.send(Ok(reply));
      }
      Err(error) if error.is_session_expired() => {
        tracing::warn!(
          handle = self.handle,
          operation = %command.operation,
          "session expired underneath operation"
        );
        self.emit(ClientEvent::SessionExpired {
          operation: command.operation.clone(),
        });
        self.drop_session("session expired");

        if command.attempts >= MAX_RECONNECT_ATTEMPTS
          || self.reconnect_attempts >= MAX_RECONNECT_ATTEMPTS
        {
          let attempts = command.attempts.max(self.reconnect_attempts);
          tracing::error!(
            handle = self.handle,
            operation = %command.operation,
            attempts,
            "giving up on operation, reconnect attempts exhausted"
          );
          let _ = command.reply_tx.send(Err(VimError::ReconnectExhausted {
            attempts,
            message: error.to_string(),
          }));
          return;
        }

        command.attempts += 1;
        self.reconnect_attempts += 1;
        self.emit(ClientEvent::Reconnecting {
          attempt: self.reconnect_attempts,
        });
        // The retried command keeps its place at the head of the queue and
        // its original reply channel.
        self.pending.push_front(command);
        self.trigger_handshake();
      }
      Err(error) => {
        let _ = command.reply_tx.send(Err(error));
      }
    }
  }

  /// Starts the handshake task unless one is already running or a session
  /// is live.
  fn trigger_handshake(&mut self) {
    if self.state != ConnectionState::Disconnected {
      return;
    }
    self.state = ConnectionState::Connecting;
    self.emit(ClientEvent::Connecting {
      endpoint: self.endpoint.to_string(),
    });
    tracing::debug!(
      handle = self.handle,
      endpoint = %self.endpoint,
      "starting connect handshake"
    );
    // The task reports back through the mailbox; its join handle is not
    // tracked.
    let _ = Handshake {
      config: self.config.clone(),
      endpoint: self.endpoint.clone(),
      factory: self.factory.clone(),
      mailbox: self.mailbox_sender.clone(),
      client_handle: self.handle,
    }
    .spawn();
  }

  async fn handle_handshake_finished(&mut self, result: Result<HandshakeOutcome, VimError>) {
    if self.state != ConnectionState::Connecting {
      // Stale completion: the client was demoted or closed while the
      // handshake task ran.
      tracing::warn!(
        handle = self.handle,
        state = ?self.state,
        "ignoring handshake completion in unexpected state"
      );
      return;
    }

    match result {
      Ok(outcome) => {
        let user_name = outcome.info.user_name.clone();
        let full_name = outcome.info.full_name.clone();

        // Bind the token before any pending dispatch so no operation races
        // a transport mid-rebind.
        outcome.transport.bind_security(outcome.token.clone());
        self.transport = Some(outcome.transport);
        self.session = Some(Session {
          info: outcome.info,
          service_content: outcome.service_content,
          token: outcome.token,
        });
        self.reconnect_attempts = 0;
        self.state = ConnectionState::Ready;

        tracing::info!(
          handle = self.handle,
          user = %user_name,
          pending = self.pending.len(),
          "session established"
        );
        self.emit(ClientEvent::Ready {
          user_name,
          full_name,
        });
        self.drain_pending().await;
      }
      Err(error) => {
        tracing::warn!(handle = self.handle, %error, "handshake failed");
        self.state = ConnectionState::Disconnected;
        self.emit(ClientEvent::HandshakeFailed {
          endpoint: self.endpoint.to_string(),
          error_msg: error.to_string(),
        });

        // Handshakes are not retried automatically: everything that queued
        // up behind this one fails with its error. Credential rejections
        // keep their distinct kind.
        let authentication = matches!(error, VimError::AuthenticationFailed(_));
        let message = match &error {
          VimError::AuthenticationFailed(message) => message.clone(),
          other => other.to_string(),
        };
        while let Some(command) = self.pending.pop_front() {
          let failure = if authentication {
            VimError::AuthenticationFailed(message.clone())
          } else {
            VimError::HandshakeFailed(message.clone())
          };
          let _ = command.reply_tx.send(Err(failure));
        }
      }
    }
  }

  /// Releases queued operations strictly in arrival order. A dispatch can
  /// demote the state again (session expiry), which stops the drain until
  /// the next transition to Ready.
  async fn drain_pending(&mut self) {
    while self.state == ConnectionState::Ready {
      let command = match self.pending.pop_front() {
        Some(command) => command,
        None => break,
      };
      self.dispatch(command).await;
    }
  }

  /// Ends the current session locally: clears session and transport and
  /// transitions to Disconnected.
  fn drop_session(&mut self, reason: &str) {
    if self.state == ConnectionState::Disconnected && self.session.is_none() {
      return;
    }
    tracing::debug!(handle = self.handle, reason, "session ended, client disconnected");
    self.state = ConnectionState::Disconnected;
    self.session = None;
    self.transport = None;
    self.emit(ClientEvent::Disconnected);
  }

  /// Graceful shutdown: best-effort logout of a live session, then failure
  /// of anything still queued.
  async fn teardown(&mut self) {
    if self.state == ConnectionState::Ready {
      if let (Some(transport), Some(session)) = (self.transport.clone(), self.session.as_ref()) {
        let args = json!({ "_this": session.info.session_manager });
        match CommandExecutor::new(transport).execute(LOGOUT, &args).await {
          Ok(_) => tracing::debug!(handle = self.handle, "logged out during teardown"),
          Err(error) => {
            // Best-effort only; the session dies with the client either way.
            tracing::warn!(handle = self.handle, %error, "logout during teardown failed");
          }
        }
      }
    }
    self.drop_session("client closed");
    while let Some(command) = self.pending.pop_front() {
      let _ = command
        .reply_tx
        .send(Err(VimError::InvalidState("client is closed")));
    }
    self.emit(ClientEvent::Closed);
  }

  fn status(&self) -> ClientStatus {
    ClientStatus {
      state: self.state,
      session: self.session.as_ref().map(|session| session.info.clone()),
      service_content: self
        .session
        .as_ref()
        .map(|session| session.service_content.clone()),
      reconnect_attempts: self.reconnect_attempts,
    }
  }

  fn emit(&mut self, event: ClientEvent) {
    let sender = match &self.monitor_tx {
      Some(sender) => sender,
      None => return,
    };
    match sender.try_send(event) {
      Ok(()) => {}
      Err(async_channel::TrySendError::Full(event)) => {
        tracing::warn!(
          handle = self.handle,
          event = ?event,
          "monitor channel full, dropping event"
        );
      }
      Err(async_channel::TrySendError::Closed(_)) => {
        // Receiver went away; stop emitting.
        self.monitor_tx = None;
      }
    }
  }
}
