//! One assistant turn: handler, response, synthesis, completion

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::core::trace::{Attrs, TraceSink, Tracer};
use crate::core::transport::{AsrState, OutgoingMessage, Transport};
use crate::core::tts::ResponseReader;
use crate::core::turn::{HandlerError, TurnContext, TurnHandler};
use crate::core::utterance::{FinalizedUtterance, TurnAction};
use crate::utils::panic_message;

/// Everything a session needs to answer a finalized utterance
pub(crate) struct TurnRunner {
    pub session_id: String,
    pub handler: Arc<dyn TurnHandler>,
    pub reader: Arc<ResponseReader>,
    pub transport: Arc<dyn Transport>,
    pub sink: Arc<dyn TraceSink>,
}

impl TurnRunner {
    pub async fn send(&self, message: OutgoingMessage) {
        let kind = message.kind();
        if let Err(e) = self.transport.send(message).await {
            warn!("Failed to send {} message: {}", kind, e);
        }
    }

    pub async fn send_state(&self, state: AsrState) {
        self.send(OutgoingMessage::AsrState { state }).await;
    }

    /// Announce a finalized utterance and build the action that answers it.
    pub async fn begin(self: Arc<Self>, utterance: FinalizedUtterance) -> TurnAction {
        let trace_id = Uuid::new_v4().to_string();
        let tracer = Tracer::new(self.session_id.as_str(), trace_id, self.sink.clone());

        self.send(OutgoingMessage::FinalTranscript {
            text: utterance.text.clone(),
        })
        .await;

        let mut attrs = Attrs::new();
        attrs.insert("text".to_string(), json!(utterance.text));
        attrs.insert("confidence".to_string(), json!(utterance.confidence));
        attrs.insert("reason".to_string(), json!(utterance.reason.to_string()));
        tracer.event("utterance.finalized", attrs).await;

        self.send_state(AsrState::Thinking).await;

        TurnAction::new(self.run(utterance, tracer))
    }

    async fn run(self: Arc<Self>, utterance: FinalizedUtterance, tracer: Tracer) {
        let context = TurnContext {
            session_id: self.session_id.clone(),
            trace_id: tracer.trace_id().to_string(),
            reason: utterance.reason.to_string(),
            tracer: tracer.clone(),
        };

        let mut attrs = Attrs::new();
        attrs.insert("chars".to_string(), json!(utterance.text.chars().count()));
        let handler = &self.handler;
        let text = utterance.text.as_str();
        let confidence = utterance.confidence;
        let result = tracer
            .span("llm.turn", attrs, |child| {
                let context = TurnContext {
                    tracer: child,
                    ..context
                };
                AssertUnwindSafe(async move { handler.handle(text, confidence, &context).await })
                    .catch_unwind()
                    .map(|outcome| {
                        outcome.unwrap_or_else(|panic| {
                            Err(HandlerError::Panicked(panic_message(panic.as_ref())))
                        })
                    })
            })
            .await;

        let response = match result {
            Ok(response) => {
                if !response.tools_used.is_empty() {
                    debug!("Turn used tools: {}", response.tools_used.join(", "));
                }
                response.text
            }
            Err(e) => {
                warn!("Turn handler failed for {:?}: {}", text, e);
                self.send(OutgoingMessage::TraceCompleted {
                    response: String::new(),
                })
                .await;
                self.send_state(AsrState::Listening).await;
                return;
            }
        };

        self.send(OutgoingMessage::AssistantResponse {
            text: response.clone(),
        })
        .await;

        let summary = self.reader.read_response(&response, &tracer).await;
        info!(
            "Turn complete: {} chars, {}/{} chunks spoken",
            response.len(),
            summary.delivered,
            summary.total_chunks
        );

        self.send(OutgoingMessage::TraceCompleted { response }).await;
        self.send_state(AsrState::Listening).await;
    }
}
