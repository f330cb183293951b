use crate::backends::{CompletionBackend, CompletionRequest};
use crate::config::{validate_temperature, ChatConfig, CompletionParams, ModelCatalog, ModelEntry};
use crate::tokenizer::HeuristicTokenizer;
use imchat_core::ImChatResult;
use imchat_session::{ConversationBuffer, TurnUsage, UsageTotals, STOP_SEQUENCE};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Result of one successful user/assistant exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct Exchange {
    pub reply: String,
    pub turn: TurnUsage,
    pub totals: UsageTotals,
}

/// Drives a conversation: user text in, assistant reply out.
///
/// Owns the [`ConversationBuffer`] and the session's model/sampling choices.
/// `send` takes `&mut self`, so a conversation has at most one request in
/// flight.
pub struct ChatController {
    buffer: ConversationBuffer,
    catalog: ModelCatalog,
    backend: Arc<dyn CompletionBackend>,
    model: String,
    temperature: f32,
    params: CompletionParams,
}

impl ChatController {
    /// Validates `config` and starts an empty conversation with its defaults.
    pub fn new(config: &ChatConfig, backend: Arc<dyn CompletionBackend>) -> ImChatResult<Self> {
        config.validate()?;
        Ok(Self {
            buffer: ConversationBuffer::new(config.conversation_settings()),
            catalog: config.catalog()?,
            backend,
            model: config.default_model.clone(),
            temperature: config.default_temperature,
            params: config.completion,
        })
    }

    /// Sends one user message and waits for the reply.
    ///
    /// On success the reply is stored, history is trimmed to the current
    /// limit and usage is recorded. On failure, or if the returned future is
    /// dropped before completion, the buffer is left exactly as it was.
    pub async fn send(&mut self, text: &str) -> ImChatResult<Exchange> {
        let entry = self.catalog.resolve(&self.model)?.clone();

        let pending = PendingTurn::begin(&mut self.buffer, text);
        let prompt = pending.prompt();
        let request = CompletionRequest {
            model: entry.name.clone(),
            prompt: prompt.clone(),
            temperature: self.temperature,
            max_tokens: self.params.max_tokens,
            top_p: self.params.top_p,
            frequency_penalty: self.params.frequency_penalty,
            presence_penalty: self.params.presence_penalty,
            stop: vec![STOP_SEQUENCE.to_string()],
        };

        let started = Instant::now();
        let reply = match self.backend.complete(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(model = %entry.name, error = %e, "Completion failed, discarding pending message");
                return Err(e);
            }
        };
        pending.commit(&reply);

        self.buffer.trim_history(self.buffer.history_limit());
        let counter = HeuristicTokenizer::new(entry.tokenizer);
        let turn = self
            .buffer
            .record_usage(&prompt, &reply, &counter, entry.price_per_1k_tokens);

        info!(
            model = %entry.name,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            tokens = turn.tokens,
            history = self.buffer.len(),
            "Exchange completed"
        );

        Ok(Exchange {
            reply,
            turn,
            totals: self.buffer.usage(),
        })
    }

    /// Switches model for subsequent requests.
    pub fn select_model(&mut self, name: &str) -> ImChatResult<()> {
        self.catalog.resolve(name)?;
        self.model = name.to_string();
        info!(model = name, "Model selected");
        Ok(())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn current_model(&self) -> ImChatResult<&ModelEntry> {
        self.catalog.resolve(&self.model)
    }

    pub fn set_temperature(&mut self, temperature: f32) -> ImChatResult<()> {
        validate_temperature(temperature)?;
        self.temperature = temperature;
        Ok(())
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn set_history_limit(&mut self, turns: usize) {
        self.buffer.set_history_limit(turns);
    }

    pub fn set_system_message(&mut self, text: impl Into<String>) {
        self.buffer.set_system_message(text);
    }

    pub fn set_prefix_message(&mut self, text: impl Into<String>) {
        self.buffer.set_prefix_message(text);
    }

    pub fn clear_history(&mut self) {
        self.buffer.clear_history();
    }

    pub fn reset_usage(&mut self) {
        self.buffer.reset_usage();
    }

    pub fn buffer(&self) -> &ConversationBuffer {
        &self.buffer
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }
}

/// A user message appended ahead of its completion call.
///
/// Removed again on drop unless [`commit`](Self::commit) stored the reply.
struct PendingTurn<'a> {
    buffer: &'a mut ConversationBuffer,
    committed: bool,
}

impl<'a> PendingTurn<'a> {
    fn begin(buffer: &'a mut ConversationBuffer, text: &str) -> Self {
        buffer.append_user_message(text);
        Self {
            buffer,
            committed: false,
        }
    }

    fn prompt(&self) -> String {
        self.buffer.build_prompt()
    }

    fn commit(mut self, reply: &str) {
        self.buffer.append_assistant_message(reply);
        self.committed = true;
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.buffer.discard_last_user_message();
        }
    }
}
