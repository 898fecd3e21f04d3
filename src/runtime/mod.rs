// src/runtime/mod.rs

//! Core asynchronous primitives: the actor command protocol and mailboxes.

pub(crate) mod command;
pub(crate) mod mailbox;

pub(crate) use command::{Command, ReplySender};
pub(crate) use mailbox::{mailbox, MailboxReceiver, MailboxSender, DEFAULT_MAILBOX_CAPACITY};
