//! In-memory transport that records deliveries, for embedding and tests.

use crate::domain::account::UserId;
use crate::domain::ports::{MessageRef, Notifier, Outbound};
use crate::error::{EngineError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Default)]
struct Recorded {
    sent: Vec<(UserId, Outbound)>,
    edits: Vec<(UserId, MessageRef, Outbound)>,
    alerts: Vec<(UserId, String)>,
    failing: HashSet<UserId>,
}

/// Notifier that keeps everything it is asked to deliver.
///
/// Clones share the same log, so a handle kept outside the engine sees every
/// message the engine sent.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every later send to `user` fails with a dispatch error.
    pub fn fail_for(&self, user: UserId) {
        self.inner.lock().failing.insert(user);
    }

    pub fn sent_to(&self, user: UserId) -> Vec<Outbound> {
        self.inner
            .lock()
            .sent
            .iter()
            .filter(|(recipient, _)| *recipient == user)
            .map(|(_, message)| message.clone())
            .collect()
    }

    pub fn last_to(&self, user: UserId) -> Option<Outbound> {
        self.sent_to(user).pop()
    }

    pub fn edits(&self) -> Vec<(UserId, MessageRef, Outbound)> {
        self.inner.lock().edits.clone()
    }

    pub fn alerts(&self) -> Vec<(UserId, String)> {
        self.inner.lock().alerts.clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, recipient: UserId, message: Outbound) -> Result<MessageRef> {
        let mut inner = self.inner.lock();
        if inner.failing.contains(&recipient) {
            return Err(EngineError::Dispatch(format!("chat {recipient} unreachable")));
        }
        inner.sent.push((recipient, message));
        Ok(MessageRef(inner.sent.len() as u64))
    }

    async fn edit(&self, recipient: UserId, target: MessageRef, message: Outbound) -> Result<()> {
        self.inner.lock().edits.push((recipient, target, message));
        Ok(())
    }

    async fn alert(&self, recipient: UserId, text: &str) -> Result<()> {
        self.inner.lock().alerts.push((recipient, text.to_string()));
        Ok(())
    }
}
