//! Per-session worker.
//!
//! One worker task per session consumes that session's transport events in
//! arrival order, so lifecycle transitions and message handling for a
//! session never interleave. Workers for different sessions run in
//! parallel and share nothing beyond the engine.

use std::ops::ControlFlow;
use std::sync::Arc;

use engine::{DeliveryStatus, Engine, Session};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    ChannelId, ChatTransport, IntentClassifier, TransportEvent, dispatcher, replies,
};

pub(crate) struct SessionWorker {
    engine: Engine,
    transport: Arc<dyn ChatTransport>,
    classifier: Arc<dyn IntentClassifier>,
    session_id: Uuid,
    user_id: Uuid,
    channel: ChannelId,
}

impl SessionWorker {
    pub(crate) fn spawn(
        engine: Engine,
        transport: Arc<dyn ChatTransport>,
        classifier: Arc<dyn IntentClassifier>,
        session: &Session,
        channel: ChannelId,
        mut events: mpsc::Receiver<TransportEvent>,
    ) -> tokio::task::JoinHandle<()> {
        let worker = Self {
            engine,
            transport,
            classifier,
            session_id: session.id,
            user_id: session.user_id,
            channel,
        };
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if worker.handle_event(event).await.is_break() {
                    break;
                }
            }
            tracing::debug!(session = %worker.session_id, "session worker stopped");
        })
    }

    async fn handle_event(&self, event: TransportEvent) -> ControlFlow<()> {
        match event {
            TransportEvent::PairingCode { code, .. } => {
                if let Err(err) = self.engine.set_pairing_code(self.session_id, &code).await {
                    tracing::error!(session = %self.session_id, "storing pairing code failed: {err}");
                }
                ControlFlow::Continue(())
            }
            TransportEvent::Ready { .. } => {
                match self.engine.mark_session_ready(self.session_id).await {
                    Ok(_) => self.flush_queue().await,
                    Err(err) => {
                        tracing::error!(session = %self.session_id, "marking session ready failed: {err}");
                    }
                }
                ControlFlow::Continue(())
            }
            TransportEvent::Message { text, sender, .. } => {
                self.on_message(&text, &sender).await;
                ControlFlow::Continue(())
            }
            TransportEvent::Lost { .. } => {
                if let Err(err) = self.engine.mark_session_lost(self.session_id).await {
                    tracing::error!(session = %self.session_id, "marking session lost failed: {err}");
                }
                ControlFlow::Break(())
            }
        }
    }

    /// Handles one inbound message. Never lets an error escape: dispatcher
    /// failures end up in the session error log plus a fallback reply.
    async fn on_message(&self, text: &str, sender: &str) {
        if let Err(err) = self.engine.touch_session(self.session_id).await {
            tracing::warn!(session = %self.session_id, "touch failed: {err}");
        }

        let session = match self.engine.session(self.user_id, self.session_id).await {
            Ok(session) => session,
            Err(err) => {
                tracing::error!(session = %self.session_id, "session vanished: {err}");
                return;
            }
        };

        match dispatcher::handle(&self.engine, self.classifier.as_ref(), &session, text).await {
            Ok(outcome) => {
                if let Some(reply) = outcome.reply {
                    self.send_direct(&reply).await;
                }
                if session.settings.notify_budget_alerts && !outcome.alerts.is_empty() {
                    self.deliver_alerts(&session, &outcome.alerts).await;
                }
            }
            Err(err) => {
                tracing::error!(session = %self.session_id, "dispatcher failed: {err}");
                let context = serde_json::json!({
                    "message": text,
                    "sender": sender,
                });
                if let Err(log_err) = self
                    .engine
                    .log_session_error(self.session_id, &err.to_string(), context)
                    .await
                {
                    tracing::error!(session = %self.session_id, "error log write failed: {log_err}");
                }
                self.send_direct(&replies::processing_failed(session.settings.language))
                    .await;
            }
        }
    }

    /// Alerts go through the outbound queue so undelivered ones are
    /// accounted for instead of vanishing.
    async fn deliver_alerts(&self, session: &Session, alerts: &[engine::BudgetAlert]) {
        for alert in alerts {
            let text = replies::alert(session.settings.language, alert);
            let queued = match self
                .engine
                .enqueue_message(self.session_id, &text, "budget_alert", 5, None)
                .await
            {
                Ok(queued) => queued,
                Err(err) => {
                    tracing::error!(session = %self.session_id, "queueing alert failed: {err}");
                    continue;
                }
            };

            let status = match self.transport.send(&self.channel, &text).await {
                Ok(()) => DeliveryStatus::Sent,
                Err(err) => {
                    tracing::warn!(session = %self.session_id, "alert delivery failed: {err}");
                    DeliveryStatus::Failed
                }
            };
            if let Err(err) = self.engine.mark_message(queued.id, status).await {
                tracing::error!(session = %self.session_id, "marking alert failed: {err}");
            }
        }
    }

    /// Delivers messages queued while the channel was down.
    async fn flush_queue(&self) {
        let pending = match self.engine.pending_messages(self.session_id).await {
            Ok(pending) => pending,
            Err(err) => {
                tracing::error!(session = %self.session_id, "reading queue failed: {err}");
                return;
            }
        };

        for message in pending {
            let status = match self.transport.send(&self.channel, &message.content).await {
                Ok(()) => DeliveryStatus::Sent,
                Err(err) => {
                    tracing::warn!(session = %self.session_id, "queued delivery failed: {err}");
                    DeliveryStatus::Failed
                }
            };
            if let Err(err) = self.engine.mark_message(message.id, status).await {
                tracing::error!(session = %self.session_id, "marking message failed: {err}");
            }
        }
    }

    async fn send_direct(&self, text: &str) {
        if let Err(err) = self.transport.send(&self.channel, text).await {
            tracing::warn!(session = %self.session_id, "reply delivery failed: {err}");
            let context = serde_json::json!({ "reply": text });
            if let Err(log_err) = self
                .engine
                .log_session_error(self.session_id, &err.to_string(), context)
                .await
            {
                tracing::error!(session = %self.session_id, "error log write failed: {log_err}");
            }
        }
    }
}
