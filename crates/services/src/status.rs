//! Single user-visible status slot.
//!
//! Every operation outcome lands here: at most one message at a time,
//! success and error mutually exclusive. Setting either replaces the other.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Success(String),
    Error(String),
}

impl Status {
    pub fn message(&self) -> &str {
        match self {
            Self::Success(msg) | Self::Error(msg) => msg,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

#[derive(Clone)]
pub struct StatusSlot {
    tx: Arc<watch::Sender<Option<Status>>>,
}

impl Default for StatusSlot {
    fn default() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }
}

impl StatusSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&self, message: impl Into<String>) {
        self.tx.send_replace(Some(Status::Success(message.into())));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.tx.send_replace(Some(Status::Error(message.into())));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    pub fn current(&self) -> Option<Status> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Status>> {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();
        rx
    }
}
