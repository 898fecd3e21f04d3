// src/error.rs

use std::io;
use thiserror::Error;

/// Fault text the service returns when an established session has been
/// invalidated server-side. Compared case-insensitively.
pub(crate) const SESSION_EXPIRED_SIGNATURE: &str = "session is not authenticated";
/// Fault marker newer endpoint versions use for the same condition.
pub(crate) const NOT_AUTHENTICATED_FAULT: &str = "notauthenticated";

#[derive(Error, Debug)]
#[non_exhaustive] // Allows adding more variants later without breaking change
pub enum VimError {
  // --- I/O Errors ---
  #[error("I/O error: {0}")]
  Io(#[from] io::Error), // Allows easy conversion from std::io::Error

  // --- Endpoint Errors ---
  #[error("Invalid endpoint: {0}")]
  InvalidEndpoint(String),

  // --- Transport Errors ---
  /// Network/TLS-level failure reported by the transport library.
  #[error("Transport error: {0}")]
  Transport(String),

  /// A fault returned by the service for a dispatched operation. The message
  /// carries the fault body; session-expiry classification matches on it.
  #[error("Service fault during {operation}: {message}")]
  Fault { operation: String, message: String },

  // --- Handshake Errors ---
  /// The connect + service-content phase of the handshake failed. Not
  /// retried automatically; queued operations resolve with this error.
  #[error("Handshake failed: {0}")]
  HandshakeFailed(String),

  /// The login phase of the handshake rejected the configured credentials.
  /// Distinct from session expiry: this is fatal and never retried.
  #[error("Authentication failed: {0}")]
  AuthenticationFailed(String),

  // --- Reconnection ---
  /// The bounded reconnect policy gave up on an operation. Distinguishable
  /// from a plain transport error by construction.
  #[error("Reconnect attempts exhausted after {attempts} attempts: {message}")]
  ReconnectExhausted { attempts: u32, message: String },

  // --- Response Errors ---
  /// The service answered but the response lacked a structure the handshake
  /// depends on (service content, session-manager handle, session cookie).
  #[error("Malformed response for {operation}: {message}")]
  MalformedResponse { operation: String, message: String },

  // --- State Errors ---
  #[error("Operation is invalid for the current client state: {0}")]
  InvalidState(&'static str),

  // --- Internal Errors ---
  #[error("Internal client error: {0}")]
  Internal(String),
}

impl VimError {
  /// True when the failure carries the service's session-expiry signature,
  /// i.e. the server invalidated a previously valid session underneath a
  /// dispatched operation. Only service faults qualify; transport-level
  /// failures are never classified as expiry.
  pub fn is_session_expired(&self) -> bool {
    match self {
      VimError::Fault { message, .. } => {
        let lowered = message.to_ascii_lowercase();
        lowered.contains(SESSION_EXPIRED_SIGNATURE) || lowered.contains(NOT_AUTHENTICATED_FAULT)
      }
      _ => false,
    }
  }
}
