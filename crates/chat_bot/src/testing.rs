//! Test doubles for the transport and classifier seams.
//!
//! `MockTransport` records outbound traffic and lets tests inject transport
//! events; `StaticClassifier` returns a fixed classification. Shipped as a
//! public module so dependent crates can drive the chat pipeline in their
//! own tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use engine::Language;
use tokio::sync::{Mutex, Notify};

use crate::{
    BotError, ChannelId, ChatTransport, Classification, IntentClassifier, TransportEvent,
};

/// A scriptable in-memory transport.
///
/// Two queues:
/// - **events**: injected via [`MockTransport::emit`], drained by `recv()`
/// - **sent**: everything passed to `send()`, retrievable for assertions
#[derive(Default)]
pub struct MockTransport {
    events: Mutex<VecDeque<TransportEvent>>,
    notify: Notify,
    sent: Mutex<Vec<(ChannelId, String)>>,
    opened: Mutex<Vec<String>>,
    fail_sends: std::sync::atomic::AtomicBool,
}

impl MockTransport {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a transport event for the next `recv()`.
    pub async fn emit(&self, event: TransportEvent) {
        self.events.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// All texts sent so far, with their channel.
    pub async fn sent(&self) -> Vec<(ChannelId, String)> {
        self.sent.lock().await.clone()
    }

    /// Handles `open()` was called for, in order.
    pub async fn opened(&self) -> Vec<String> {
        self.opened.lock().await.clone()
    }

    /// Makes every subsequent `send()` fail until reset.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends
            .store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    /// The channel id `open()` hands out for a handle.
    #[must_use]
    pub fn channel_for(handle: &str) -> ChannelId {
        ChannelId(format!("chan-{handle}"))
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn open(&self, handle: &str) -> Result<ChannelId, BotError> {
        self.opened.lock().await.push(handle.to_string());
        Ok(Self::channel_for(handle))
    }

    async fn send(&self, channel: &ChannelId, text: &str) -> Result<(), BotError> {
        if self.fail_sends.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(BotError::Transport("mock send failure".to_string()));
        }
        self.sent
            .lock()
            .await
            .push((channel.clone(), text.to_string()));
        Ok(())
    }

    async fn close(&self, _channel: &ChannelId) -> Result<(), BotError> {
        Ok(())
    }

    async fn recv(&self) -> Option<TransportEvent> {
        loop {
            {
                let mut events = self.events.lock().await;
                if let Some(event) = events.pop_front() {
                    return Some(event);
                }
            }
            self.notify.notified().await;
        }
    }
}

/// Classifier that always returns the same result, for threshold and
/// routing tests.
#[derive(Clone, Debug, Default)]
pub struct StaticClassifier {
    pub result: Classification,
}

impl StaticClassifier {
    #[must_use]
    pub fn new(result: Classification) -> Self {
        Self { result }
    }
}

#[async_trait]
impl IntentClassifier for StaticClassifier {
    async fn classify(&self, _language: Language, _text: &str) -> Classification {
        self.result.clone()
    }
}
