// src/client/executor.rs

use crate::error::VimError;
use crate::transport::{ITransport, InvokeReply};

use serde_json::Value;
use std::sync::Arc;

/// Executes exactly one remote operation through an established transport.
///
/// A new executor is constructed per dispatch and consumed by it; the
/// connection actor owns classification of the outcome and is the only
/// component that resolves the caller's handle.
pub(crate) struct CommandExecutor {
  transport: Arc<dyn ITransport>,
}

impl CommandExecutor {
  pub(crate) fn new(transport: Arc<dyn ITransport>) -> Self {
    Self { transport }
  }

  /// Runs the operation to completion and returns the raw outcome.
  pub(crate) async fn execute(
    self,
    operation: &str,
    args: &Value,
  ) -> Result<InvokeReply, VimError> {
    tracing::trace!(operation, "executing remote operation");
    let outcome = self.transport.invoke(operation, args).await;
    match &outcome {
      Ok(_) => tracing::trace!(operation, "remote operation succeeded"),
      Err(error) => tracing::debug!(operation, %error, "remote operation failed"),
    }
    outcome
  }
}
