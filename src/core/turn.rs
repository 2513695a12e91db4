//! The language-model side of a turn, consumed through [`TurnHandler`]

use std::future::Future;

use async_trait::async_trait;
use serde_json::json;

use super::trace::{Attrs, Tracer};

/// Errors from a turn handler
#[derive(Debug, Clone, thiserror::Error)]
pub enum HandlerError {
    #[error("Tool selection failed: {0}")]
    ToolSelection(String),
    #[error("Tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },
    #[error("Model error: {0}")]
    Model(String),
    #[error("Turn handler error: {0}")]
    Other(String),
    #[error("Turn handler panicked: {0}")]
    Panicked(String),
}

/// What the handler produced for one user utterance
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnResponse {
    pub text: String,
    pub tools_used: Vec<String>,
}

impl TurnResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tools_used: Vec::new(),
        }
    }
}

/// Per-turn context handed to the handler
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub session_id: String,
    pub trace_id: String,
    /// Decision reason that finalized the utterance
    pub reason: String,
    pub tracer: Tracer,
}

impl TurnContext {
    /// Run tool selection inside a `tool_selection.total` span
    pub async fn select_tools<F, Fut, T>(&self, f: F) -> Result<T, HandlerError>
    where
        F: FnOnce(Tracer) -> Fut,
        Fut: Future<Output = Result<T, HandlerError>>,
    {
        self.tracer.span("tool_selection.total", Attrs::new(), f).await
    }

    /// Run one tool inside a `tool.<name>` span
    pub async fn execute_tool<F, Fut, T>(&self, tool: &str, f: F) -> Result<T, HandlerError>
    where
        F: FnOnce(Tracer) -> Fut,
        Fut: Future<Output = Result<T, HandlerError>>,
    {
        let mut attrs = Attrs::new();
        attrs.insert("tool".to_string(), json!(tool));
        self.tracer.span(&format!("tool.{tool}"), attrs, f).await
    }
}

/// Produces the assistant's answer to a finalized utterance.
///
/// The future may be dropped at any await point when the user barges in.
#[async_trait]
pub trait TurnHandler: Send + Sync {
    async fn handle(
        &self,
        text: &str,
        confidence: f32,
        context: &TurnContext,
    ) -> Result<TurnResponse, HandlerError>;
}
