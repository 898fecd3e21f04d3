// src/runtime/mailbox.rs

//! Type aliases for actor communication channels based on `async-channel`.

use crate::runtime::command::Command;

/// The sending end of the client actor's mailbox. Cloneable, so any number
/// of public handles and internal tasks can send commands to the same actor.
pub(crate) type MailboxSender = async_channel::Sender<Command>;

/// The receiving end of the client actor's mailbox. Owned by exactly one
/// task so commands are processed sequentially in arrival order.
pub(crate) type MailboxReceiver = async_channel::Receiver<Command>;

/// Default capacity for the bounded mailbox created by [`mailbox`]. Large
/// enough that callers only feel backpressure under pathological command
/// bursts.
pub(crate) const DEFAULT_MAILBOX_CAPACITY: usize = 1024;

/// Creates a new bounded mailbox channel pair.
pub(crate) fn mailbox(capacity: usize) -> (MailboxSender, MailboxReceiver) {
  async_channel::bounded(capacity.max(1))
}
