// src/session.rs

use crate::transport::cookie::SessionToken;

use serde::Serialize;
use serde_json::Value;

/// Attributes of an authenticated session, as exposed to callers through
/// status snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
  /// Managed-object handle of the session manager; follow-up session
  /// operations (notably logout) are addressed to it.
  pub session_manager: String,
  /// Account name the service reported for the login.
  pub user_name: String,
  /// Human-readable name the service reported for the login.
  pub full_name: String,
}

/// Full session state held by the connection actor while a login is live.
/// Created on login success; dropped on logout (success or failure), on a
/// session-expiry error, and on disconnect.
#[derive(Debug)]
pub(crate) struct Session {
  pub info: SessionInfo,
  /// Service-content structure retrieved during the handshake; retained so
  /// callers can address the service's managed objects.
  pub service_content: Value,
  /// The cookie bound to the transport for this session. Held for the
  /// session's lifetime even though the transport carries it implicitly.
  #[allow(dead_code)]
  pub token: SessionToken,
}
