//! The exchange orchestrator.
//!
//! One `handle()` call is one exchange: classify intent, retrieve
//! supporting knowledge, read the session window, assemble the prompt,
//! delegate to the gateway and commit the resulting turn pair. The
//! per-key commit happens only after the gateway call returns, so the
//! committed pair order on a session follows gateway-return order, and a
//! failed call commits nothing.

use std::sync::Arc;

use chrono::Utc;
use heliolab_core::error::{Error, Result};
use heliolab_core::event::{DomainEvent, EventBus};
use heliolab_core::gateway::{GatewayRequest, ModelGateway};
use heliolab_core::intent::IntentLabel;
use heliolab_core::knowledge::Category;
use heliolab_core::prompt::Task;
use heliolab_core::session::Turn;
use heliolab_knowledge::RetrievalEngine;
use heliolab_session::SessionStore;
use tracing::{debug, info, warn};

use crate::prompt;
use crate::reply::{parse_reply, AssistResponse, StructuredReply};

/// Engine tunables, usually derived from `AppConfig`.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Target model identifier
    pub model: String,
    /// Maximum tokens per reply
    pub max_tokens: u32,
    /// Knowledge entries folded into one prompt
    pub top_k: usize,
    /// Prior turns included in the prompt window
    pub history_window: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            model: "claude-sonnet-4-5-20250929".into(),
            max_tokens: 4096,
            top_k: 4,
            history_window: 10,
        }
    }
}

impl From<&heliolab_config::AppConfig> for EngineSettings {
    fn from(config: &heliolab_config::AppConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            top_k: config.retrieval.top_k,
            history_window: config.session.turn_cap,
        }
    }
}

/// One inbound exchange request.
#[derive(Debug, Clone)]
pub struct AssistRequest {
    /// Caller-supplied session key; a fresh one is generated when absent
    pub session_key: Option<String>,
    /// Optional user identifier, attached at session creation
    pub user_id: Option<String>,
    /// The user message
    pub message: String,
    /// Whether to fold retrieved knowledge into the prompt
    pub include_context: bool,
    /// Optional category restriction for retrieval
    pub category_hint: Option<String>,
    /// Explicit task; inferred from intent when absent
    pub task: Option<Task>,
}

impl AssistRequest {
    /// A plain chat request with context enabled.
    pub fn chat(session_key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            session_key: Some(session_key.into()),
            user_id: None,
            message: message.into(),
            include_context: true,
            category_hint: None,
            task: None,
        }
    }
}

/// The context assembler / AI engine.
pub struct AssistEngine {
    gateway: Arc<dyn ModelGateway>,
    store: Arc<SessionStore>,
    retrieval: RetrievalEngine,
    events: Arc<EventBus>,
    settings: EngineSettings,
}

impl AssistEngine {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        store: Arc<SessionStore>,
        retrieval: RetrievalEngine,
        events: Arc<EventBus>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            gateway,
            store,
            retrieval,
            events,
            settings,
        }
    }

    /// Run one exchange. On gateway failure no turn is committed and the
    /// typed error propagates; validation failures reject before any
    /// session or gateway interaction.
    pub async fn handle(&self, request: AssistRequest) -> Result<StructuredReply> {
        // -- Validate ------------------------------------------------------
        let message = request.message.trim();
        if message.is_empty() {
            return Err(Error::validation("message must not be empty"));
        }
        let hint = match &request.category_hint {
            Some(raw) => Some(
                Category::parse(raw)
                    .ok_or_else(|| Error::validation(format!("unknown category hint: {raw}")))?,
            ),
            None => None,
        };

        let session_key = match request.session_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => self.store.generate_key().0,
        };

        // -- Classify ------------------------------------------------------
        let intent = heliolab_intent::classify(message);
        let task = request.task.unwrap_or_else(|| default_task_for(intent.label));
        debug!(
            session_key = %session_key,
            intent = %intent.label,
            confidence = intent.confidence,
            task = %task,
            "Classified exchange"
        );

        // -- Retrieve ------------------------------------------------------
        let retrieved = if request.include_context {
            let entries = self.retrieval.retrieve(message, self.settings.top_k, hint);
            debug!(count = entries.len(), "Retrieved knowledge entries");
            entries
        } else {
            Vec::new()
        };

        // -- Assemble ------------------------------------------------------
        let snapshot = self
            .store
            .get_or_create(&session_key, request.user_id.as_deref())
            .await;
        let history = snapshot.window(self.settings.history_window).to_vec();
        let assembled = prompt::assemble(task, &history, &retrieved, message);

        let gateway_request = GatewayRequest {
            prompt: assembled,
            model: self.settings.model.clone(),
            max_tokens: self.settings.max_tokens,
            temperature: prompt::temperature_for(task),
        };

        // -- Gateway call --------------------------------------------------
        // The only blocking step. The commit below happens strictly after
        // the call returns; on failure nothing is committed.
        let reply = match self.gateway.complete(gateway_request).await {
            Ok(reply) => reply,
            Err(error) => {
                warn!(session_key = %session_key, error = %error, "Gateway call failed");
                self.events.publish(DomainEvent::GatewayFailed {
                    session_key: session_key.clone(),
                    reason: error.to_string(),
                    timestamp: Utc::now(),
                });
                return Err(Error::Gateway(error));
            }
        };

        // -- Parse and commit ----------------------------------------------
        let structured = parse_reply(session_key.clone(), task, reply);
        self.store
            .append_exchange(
                &session_key,
                request.user_id.as_deref(),
                Turn::user(message),
                Turn::assistant(structured.body.text()),
            )
            .await;

        self.events.publish(DomainEvent::ExchangeCompleted {
            session_key: session_key.clone(),
            task: task.to_string(),
            intent: intent.label.to_string(),
            tokens_used: structured.usage.total(),
            timestamp: Utc::now(),
        });
        info!(
            session_key = %session_key,
            task = %task,
            tokens = structured.usage.total(),
            "Exchange committed"
        );

        Ok(structured)
    }

    /// Like `handle`, wrapped into the caller-facing envelope with an
    /// explicit success flag.
    pub async fn respond(&self, request: AssistRequest) -> AssistResponse {
        match self.handle(request).await {
            Ok(reply) => AssistResponse::ok(reply),
            Err(error) => AssistResponse::failure(error.to_string()),
        }
    }
}

/// Default task when the caller names none, inferred from intent.
fn default_task_for(label: IntentLabel) -> Task {
    match label {
        IntentLabel::Troubleshoot => Task::Troubleshoot,
        IntentLabel::AnalyzeData => Task::Analyze,
        IntentLabel::ReviewReport => Task::Review,
        IntentLabel::DecisionSupport => Task::Decide,
        IntentLabel::Question | IntentLabel::Chat => Task::Chat,
    }
}
