use crate::domain::ports::CallbackSink;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// A completion message addressed to the scripting layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostMessage {
    /// Object receiving the message on the host side.
    pub target: String,
    pub method: String,
    pub payload: String,
}

/// Hands completion messages over to the host's dispatch context.
///
/// Callbacks may fire on any thread; the host drains the paired
/// [`MailboxReceiver`] from the context it delivers messages on.
#[derive(Clone)]
pub struct HostMailbox {
    target: String,
    outbox: UnboundedSender<HostMessage>,
}

pub struct MailboxReceiver {
    inbox: UnboundedReceiver<HostMessage>,
}

impl HostMailbox {
    pub fn new(target: impl Into<String>) -> (Self, MailboxReceiver) {
        let (outbox, inbox) = mpsc::unbounded_channel();
        (
            Self {
                target: target.into(),
                outbox,
            },
            MailboxReceiver { inbox },
        )
    }
}

impl CallbackSink for HostMailbox {
    fn send(&self, method: &str, message: String) {
        let message = HostMessage {
            target: self.target.clone(),
            method: method.to_string(),
            payload: message,
        };
        if let Err(lost) = self.outbox.send(message) {
            tracing::warn!(method = %lost.0.method, "host mailbox closed, dropping message");
        }
    }
}

impl MailboxReceiver {
    /// Takes every message posted so far.
    pub fn drain(&mut self) -> Vec<HostMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.inbox.try_recv() {
            messages.push(message);
        }
        messages
    }
}
