//! Chat side of Celengan.
//!
//! Bridges a chat transport to the ledger engine: a supervisor owns one
//! sequential worker per session, the dispatcher classifies inbound text
//! and routes recognized intents to the engine, and replies flow back over
//! the transport. The transport and the classifier are trait seams; this
//! crate ships a rule-based pattern classifier and leaves the concrete
//! messaging bridge to the deployment.

use std::collections::HashMap;
use std::sync::Arc;

use engine::{Engine, Session};
use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

pub use classifier::{
    Classification, Intent, IntentClassifier, PatternClassifier, match_custom_phrases,
};
pub use dispatcher::{COMMAND_PREFIX, DispatchOutcome};
pub use error::BotError;
pub use extract::{ExtractError, extract_amount, extract_category};
pub use transport::{ChannelId, ChatTransport, DisabledTransport, TransportEvent};

mod classifier;
mod dispatcher;
mod error;
mod extract;
mod replies;
mod session;
pub mod testing;
mod transport;

/// Bound on the per-session event queue; sends back-pressure the transport
/// pump rather than reordering or dropping events.
const EVENT_QUEUE_CAPACITY: usize = 64;

struct WorkerHandle {
    events: mpsc::Sender<TransportEvent>,
    channel: ChannelId,
    task: tokio::task::JoinHandle<()>,
}

#[derive(Default)]
struct SupervisorState {
    by_session: HashMap<Uuid, WorkerHandle>,
    by_channel: HashMap<ChannelId, Uuid>,
}

/// Process-local supervisor table: session id → running worker.
///
/// There is deliberately no global channel registry; ownership of a channel
/// lives in the session record, and this table only tracks the workers of
/// this process.
pub struct SessionSupervisor {
    engine: Engine,
    transport: Arc<dyn ChatTransport>,
    classifier: Arc<dyn IntentClassifier>,
    state: Mutex<SupervisorState>,
}

impl SessionSupervisor {
    pub fn new(
        engine: Engine,
        transport: Arc<dyn ChatTransport>,
        classifier: Arc<dyn IntentClassifier>,
    ) -> Self {
        Self {
            engine,
            transport,
            classifier,
            state: Mutex::new(SupervisorState::default()),
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Pumps transport events into the per-session workers until the
    /// transport shuts down.
    pub async fn run(&self) {
        tracing::info!("chat supervisor started");
        while let Some(event) = self.transport.recv().await {
            self.dispatch_event(event).await;
        }
        tracing::info!("chat transport closed, supervisor stopping");
    }

    /// Routes one transport event to its session worker. Events for the
    /// same session keep arrival order; unknown channels are dropped with a
    /// warning.
    pub async fn dispatch_event(&self, event: TransportEvent) {
        let channel = event.channel().clone();
        let is_lost = matches!(event, TransportEvent::Lost { .. });

        let sender = {
            let mut state = self.state.lock().await;
            let Some(session_id) = state.by_channel.get(&channel).copied() else {
                tracing::warn!(%channel, "event for unknown channel dropped");
                return;
            };
            let Some(handle) = state.by_session.get(&session_id) else {
                tracing::warn!(%channel, "worker already gone");
                return;
            };
            let sender = handle.events.clone();
            if is_lost {
                // The worker drains its queue and exits after the Lost
                // event; stop routing to it now.
                state.by_channel.remove(&channel);
                state.by_session.remove(&session_id);
            }
            sender
        };

        if sender.send(event).await.is_err() {
            tracing::warn!(%channel, "worker queue closed, event dropped");
        }
    }

    /// Creates or resumes the session for (user, handle), opens a channel
    /// and starts its worker. Re-initializing an already running session is
    /// a no-op returning the existing session.
    pub async fn initialize(&self, user_id: Uuid, handle: &str) -> Result<Session, BotError> {
        let session = self.engine.initialize_session(user_id, handle).await?;

        {
            let state = self.state.lock().await;
            if state.by_session.contains_key(&session.id) {
                return Ok(session);
            }
        }

        let channel = self.transport.open(handle).await?;
        let (events, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
        let task = session::SessionWorker::spawn(
            self.engine.clone(),
            self.transport.clone(),
            self.classifier.clone(),
            &session,
            channel.clone(),
            rx,
        );

        {
            let mut state = self.state.lock().await;
            state.by_channel.insert(channel.clone(), session.id);
            state.by_session.insert(
                session.id,
                WorkerHandle {
                    events,
                    channel,
                    task,
                },
            );
        }

        let session = self.engine.mark_session_pending(session.id).await?;
        tracing::info!(session = %session.id, handle, "session initializing");
        Ok(session)
    }

    /// Explicit disconnect: closes the channel, stops the worker, marks the
    /// session inactive and fails whatever was still queued.
    pub async fn disconnect(&self, user_id: Uuid, session_id: Uuid) -> Result<Session, BotError> {
        self.stop_worker(session_id).await;
        let session = self.engine.disconnect_session(user_id, session_id).await?;
        tracing::info!(session = %session.id, "session disconnected");
        Ok(session)
    }

    /// Deletes a session, disconnecting first when it is still active.
    pub async fn delete(&self, user_id: Uuid, session_id: Uuid) -> Result<(), BotError> {
        let session = self.engine.session(user_id, session_id).await?;
        if session.is_active() {
            self.disconnect(user_id, session_id).await?;
        } else {
            self.stop_worker(session_id).await;
        }
        self.engine.delete_session(user_id, session_id).await?;
        tracing::info!(session = %session_id, "session deleted");
        Ok(())
    }

    async fn stop_worker(&self, session_id: Uuid) {
        let handle = {
            let mut state = self.state.lock().await;
            let handle = state.by_session.remove(&session_id);
            if let Some(handle) = &handle {
                state.by_channel.remove(&handle.channel);
            }
            handle
        };

        if let Some(handle) = handle {
            if let Err(err) = self.transport.close(&handle.channel).await {
                tracing::warn!(session = %session_id, "channel close failed: {err}");
            }
            handle.task.abort();
        }
    }
}
