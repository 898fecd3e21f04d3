// src/config.rs

use std::fmt;

/// Immutable connection settings for one client instance. Constructed once
/// at client creation and never mutated afterwards.
#[derive(Clone)]
pub struct ConnectionConfig {
  /// Host name or address of the management endpoint.
  pub host: String,
  /// Account used for the login operation.
  pub username: String,
  /// Password for the login operation.
  pub password: String,
  /// Whether the transport should verify the server certificate. Off by
  /// default: management endpoints commonly run self-signed certificates.
  pub ssl_verify: bool,
}

impl ConnectionConfig {
  pub fn new(
    host: impl Into<String>,
    username: impl Into<String>,
    password: impl Into<String>,
  ) -> Self {
    Self {
      host: host.into(),
      username: username.into(),
      password: password.into(),
      ssl_verify: false,
    }
  }

  /// Enables or disables server-certificate verification.
  pub fn with_ssl_verify(mut self, verify: bool) -> Self {
    self.ssl_verify = verify;
    self
  }

  /// The TLS policy handed to transport construction for this client.
  pub(crate) fn tls_options(&self) -> TlsOptions {
    TlsOptions {
      verify_peer: self.ssl_verify,
    }
  }
}

impl fmt::Debug for ConnectionConfig {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // Keep the password out of logs.
    f.debug_struct("ConnectionConfig")
      .field("host", &self.host)
      .field("username", &self.username)
      .field("password", &"<redacted>")
      .field("ssl_verify", &self.ssl_verify)
      .finish()
  }
}

/// TLS policy for a single transport handle. Scoped to the handle it
/// configures; this crate never touches process-global TLS state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlsOptions {
  /// Verify the server certificate chain and host name.
  pub verify_peer: bool,
}
