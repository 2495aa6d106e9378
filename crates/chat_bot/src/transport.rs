//! Chat transport capability contract.
//!
//! The concrete messaging bridge (WhatsApp, Telegram, ...) lives outside
//! this workspace; the bot only needs the capability to open a channel per
//! handle, push text out, and consume a stream of typed lifecycle events.
//! Events arrive through [`ChatTransport::recv`] and are fanned out to one
//! sequential worker per session, never through shared-state callbacks.

use async_trait::async_trait;

use crate::BotError;

/// Opaque identifier of one open channel.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ChannelId(pub String);

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle events a transport emits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// A pairing artifact (e.g. a QR payload) is ready to show the user.
    PairingCode { channel: ChannelId, code: String },
    /// The channel finished pairing and can deliver messages.
    Ready { channel: ChannelId },
    /// An inbound message from the paired peer.
    Message {
        channel: ChannelId,
        text: String,
        sender: String,
    },
    /// The channel was lost (logout, network, remote teardown).
    Lost { channel: ChannelId },
}

impl TransportEvent {
    pub(crate) fn channel(&self) -> &ChannelId {
        match self {
            Self::PairingCode { channel, .. }
            | Self::Ready { channel }
            | Self::Message { channel, .. }
            | Self::Lost { channel } => channel,
        }
    }
}

/// Capability contract of the messaging bridge.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Requests a channel for the given chat handle. Pairing continues
    /// asynchronously through [`TransportEvent`]s.
    async fn open(&self, handle: &str) -> Result<ChannelId, BotError>;

    /// Sends text over an open channel.
    async fn send(&self, channel: &ChannelId, text: &str) -> Result<(), BotError>;

    /// Tears a channel down.
    async fn close(&self, channel: &ChannelId) -> Result<(), BotError>;

    /// Next transport event; `None` once the transport shut down.
    async fn recv(&self) -> Option<TransportEvent>;
}

/// Placeholder transport for deployments that run the HTTP API without a
/// chat bridge. Opening a channel fails with a transport error; the event
/// stream is empty.
#[derive(Debug, Default)]
pub struct DisabledTransport;

#[async_trait]
impl ChatTransport for DisabledTransport {
    async fn open(&self, handle: &str) -> Result<ChannelId, BotError> {
        Err(BotError::Transport(format!(
            "no chat transport configured (handle {handle})"
        )))
    }

    async fn send(&self, _channel: &ChannelId, _text: &str) -> Result<(), BotError> {
        Err(BotError::Transport(
            "no chat transport configured".to_string(),
        ))
    }

    async fn close(&self, _channel: &ChannelId) -> Result<(), BotError> {
        Ok(())
    }

    async fn recv(&self) -> Option<TransportEvent> {
        None
    }
}
