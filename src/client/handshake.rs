// src/client/handshake.rs

//! The connect + login sequence establishing an authenticated session.
//!
//! The handshake runs on its own task and reports completion into the
//! client actor's mailbox, so the actor stays responsive (and keeps queueing
//! commands) while the sequence is in flight. The actor guards re-entry
//! through its `Connecting` state: at most one handshake task exists at a
//! time.

use crate::client::operations::{LOGIN, RETRIEVE_SERVICE_CONTENT, SERVICE_INSTANCE};
use crate::config::ConnectionConfig;
use crate::error::VimError;
use crate::runtime::{Command, MailboxSender};
use crate::session::SessionInfo;
use crate::transport::cookie::{self, SessionToken};
use crate::transport::{ITransport, ITransportFactory};

use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use url::Url;

/// Everything a successful handshake hands back to the actor: the connected
/// transport, the retrieved service content, the identity attributes from
/// login, and the session token to bind.
pub(crate) struct HandshakeOutcome {
  pub transport: Arc<dyn ITransport>,
  pub service_content: Value,
  pub info: SessionInfo,
  pub token: SessionToken,
}

impl fmt::Debug for HandshakeOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("HandshakeOutcome")
      .field("info", &self.info)
      .finish_non_exhaustive()
  }
}

pub(crate) struct Handshake {
  pub config: ConnectionConfig,
  pub endpoint: Url,
  pub factory: Arc<dyn ITransportFactory>,
  /// Mailbox of the client actor the completion report goes to.
  pub mailbox: MailboxSender,
  /// Handle of the parent actor, for logging.
  pub client_handle: usize,
}

impl Handshake {
  /// Spawns the handshake task. The result lands in the actor mailbox as
  /// `Command::HandshakeFinished`; if the mailbox is already closed the
  /// actor is gone and the outcome is moot.
  pub(crate) fn spawn(self) -> JoinHandle<()> {
    tokio::spawn(async move {
      let result = self.perform().await;
      if self.mailbox.send(Command::HandshakeFinished { result }).await.is_err() {
        tracing::debug!(
          handle = self.client_handle,
          "client actor stopped before handshake completion could be reported"
        );
      }
    })
  }

  /// The sequential handshake steps. Each step either yields the input of
  /// the next or aborts the whole sequence with its error.
  async fn perform(&self) -> Result<HandshakeOutcome, VimError> {
    tracing::debug!(
      handle = self.client_handle,
      endpoint = %self.endpoint,
      "handshake: constructing transport"
    );
    let transport = self
      .factory
      .create(&self.endpoint, &self.config.tls_options())
      .await?;

    tracing::debug!(handle = self.client_handle, "handshake: retrieving service content");
    let content_reply = transport
      .invoke(RETRIEVE_SERVICE_CONTENT, &json!({ "_this": SERVICE_INSTANCE }))
      .await?;
    let service_content = match content_reply.result.get("returnval") {
      Some(content) => content.clone(),
      None => {
        return Err(VimError::MalformedResponse {
          operation: RETRIEVE_SERVICE_CONTENT.into(),
          message: "response carries no returnval".into(),
        })
      }
    };
    let session_manager = match service_content.get("sessionManager").and_then(Value::as_str) {
      Some(handle) => handle.to_string(),
      None => {
        return Err(VimError::MalformedResponse {
          operation: RETRIEVE_SERVICE_CONTENT.into(),
          message: "service content carries no sessionManager handle".into(),
        })
      }
    };

    tracing::debug!(
      handle = self.client_handle,
      username = %self.config.username,
      "handshake: logging in"
    );
    let login_args = json!({
      "_this": session_manager,
      "userName": self.config.username,
      "password": self.config.password,
    });
    let login_reply = match transport.invoke(LOGIN, &login_args).await {
      Ok(reply) => reply,
      // A fault at login means the service rejected the credentials; that is
      // an authentication failure, not a transport problem.
      Err(VimError::Fault { message, .. }) => {
        return Err(VimError::AuthenticationFailed(message))
      }
      Err(other) => return Err(other),
    };

    let token = match cookie::extract_session_token(&login_reply.headers) {
      Some(token) => token,
      None => {
        return Err(VimError::MalformedResponse {
          operation: LOGIN.into(),
          message: "login response carries no session cookie".into(),
        })
      }
    };

    // Identity attributes are informational; a service that omits them does
    // not fail the handshake.
    let returnval = login_reply.result.get("returnval").cloned().unwrap_or(Value::Null);
    let user_name = returnval
      .get("userName")
      .and_then(Value::as_str)
      .unwrap_or_default()
      .to_string();
    let full_name = returnval
      .get("fullName")
      .and_then(Value::as_str)
      .unwrap_or_default()
      .to_string();

    Ok(HandshakeOutcome {
      transport,
      service_content,
      info: SessionInfo {
        session_manager,
        user_name,
        full_name,
      },
      token,
    })
  }
}
