// src/transport/mod.rs

//! The transport seam between the connection manager and the RPC library
//! that actually encodes operations on the wire.
//!
//! The manager addresses remote operations purely by name and opaque
//! argument structure; everything below that (message encoding, HTTP/TLS,
//! response decoding) belongs to the [`ITransport`] implementation. The one
//! stateful obligation an implementation carries is the bound session token:
//! once [`ITransport::bind_security`] has been called, every subsequent
//! invocation must present that token to the service.

pub mod cookie;
pub mod endpoint;

use crate::config::TlsOptions;
use crate::error::VimError;
use self::cookie::SessionToken;

use async_trait::async_trait;
use http::HeaderMap;
use serde_json::Value;
use std::sync::Arc;
use url::Url;

/// Decoded outcome of one successful remote invocation.
#[derive(Debug, Clone)]
pub struct InvokeReply {
  /// Decoded result structure of the operation.
  pub result: Value,
  /// Raw response body as returned by the service.
  pub raw: String,
  /// Response headers; the login handshake extracts the session cookie from
  /// these.
  pub headers: HeaderMap,
}

/// A connected RPC transport bound to one endpoint.
#[async_trait]
pub trait ITransport: Send + Sync {
  /// Invokes the named remote operation with the given argument structure.
  ///
  /// Service-level faults are reported as [`VimError::Fault`] with the fault
  /// body as message; lower-level failures as [`VimError::Transport`].
  async fn invoke(&self, operation: &str, args: &Value) -> Result<InvokeReply, VimError>;

  /// Attaches a session token that is carried implicitly by every subsequent
  /// invocation. Called at most once per established session; a reconnect
  /// constructs a fresh transport rather than rebinding a live one.
  fn bind_security(&self, token: SessionToken);
}

/// Constructs transport handles for an endpoint under an explicit TLS policy.
///
/// The factory is what makes the connect step of the handshake pluggable and
/// testable; construction failures surface as handshake failures.
#[async_trait]
pub trait ITransportFactory: Send + Sync {
  async fn create(&self, endpoint: &Url, tls: &TlsOptions)
    -> Result<Arc<dyn ITransport>, VimError>;
}
