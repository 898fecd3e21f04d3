// src/lib.rs

//! vsphere-client - an asynchronous, session-aware client for vSphere-style
//! hypervisor management APIs.
//!
//! The service behind these APIs is stateful: a login call yields a session
//! cookie that must accompany every later operation, and the server may
//! invalidate that session at any time. This crate owns that lifecycle. A
//! [`Client`] drives the connect + login handshake in the background, queues
//! operations issued before the session is ready, carries the session token
//! on every call, and transparently reconnects (with a bounded number of
//! attempts) when the server expires the session underneath an operation.
//!
//! Wire-level encoding is deliberately out of scope: operations are addressed
//! by name with opaque `serde_json::Value` argument structures, and the
//! actual RPC exchange is delegated to an [`ITransport`] implementation
//! supplied through an [`ITransportFactory`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use vsphere_client::{Client, ConnectionConfig, ITransportFactory, VimError};
//!
//! # async fn example(factory: Arc<dyn ITransportFactory>) -> Result<(), VimError> {
//! let config = ConnectionConfig::new("vcsa.example.com", "administrator", "secret");
//! let client = Client::connect(config, factory)?;
//!
//! // The handle is live immediately; the handshake completes in the
//! // background and this operation dispatches once the session is ready.
//! let handle = client
//!   .run_command("CurrentTime", serde_json::json!({ "_this": "ServiceInstance" }))
//!   .await;
//! let reply = handle.wait().await?;
//! println!("{}", reply.result);
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```

/// The connection manager: public [`Client`] handle, the connection actor,
/// the handshake driver, and per-operation command execution.
pub mod client;
/// Immutable connection settings and the explicit TLS policy value.
pub mod config;
/// Defines the custom error type used throughout the library.
pub mod error;
/// Core asynchronous runtime primitives: actor mailboxes and the command
/// protocol between the public handle and the connection actor.
pub(crate) mod runtime;
/// Authenticated-session data held while a login is live.
pub mod session;
/// The transport seam: invocation/factory traits, endpoint derivation, and
/// session-cookie extraction.
pub mod transport;

// Re-export the primary surface so callers can work from the crate root.
pub use client::events::{ClientEvent, MonitorReceiver, MonitorSender};
pub use client::{
  operations, Client, ClientStatus, CommandHandle, ConnectionState, MAX_RECONNECT_ATTEMPTS,
};
pub use config::{ConnectionConfig, TlsOptions};
pub use error::VimError;
pub use session::SessionInfo;
pub use transport::cookie::{extract_session_token, SessionToken};
pub use transport::endpoint::service_endpoint;
pub use transport::{ITransport, ITransportFactory, InvokeReply};
