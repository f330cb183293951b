use crate::prompt::render_prompt;
use crate::usage::{TokenCounter, TurnUsage, UsageTotals};
use imchat_core::{Message, Role};
use tracing::debug;

/// System message used when the configuration does not provide one.
pub const DEFAULT_SYSTEM_MESSAGE: &str =
    "You are an AI assistant that helps people find information.";

/// Initial values for a [`ConversationBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationSettings {
    /// Persona description rendered into the system section.
    pub system_message: String,
    /// Text prepended to every new user message; empty means none.
    pub prefix_message: String,
    /// Number of user/assistant turns kept after a trim.
    pub history_turns: usize,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            system_message: DEFAULT_SYSTEM_MESSAGE.to_string(),
            prefix_message: String::new(),
            history_turns: 3,
        }
    }
}

/// Bounded conversation history plus the prompt/usage bookkeeping around it.
///
/// Messages are append-only; the only removals are trims from the front,
/// [`clear_history`](Self::clear_history) and the rollback of a trailing user
/// message whose completion call failed. No operation here can fail.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    system_message: String,
    prefix_message: String,
    history_limit: usize,
    messages: Vec<Message>,
    usage: UsageTotals,
}

impl ConversationBuffer {
    pub fn new(settings: ConversationSettings) -> Self {
        Self {
            system_message: settings.system_message,
            prefix_message: settings.prefix_message,
            history_limit: settings.history_turns,
            messages: Vec::new(),
            usage: UsageTotals::default(),
        }
    }

    /// Stores a user message, prefixed with the prefix message when one is
    /// set. Never trims.
    pub fn append_user_message(&mut self, text: &str) {
        let content = if self.prefix_message.trim().is_empty() {
            text.to_string()
        } else {
            format!("{}\n{}", self.prefix_message, text)
        };
        self.messages.push(Message::user(content));
        debug!(len = self.messages.len(), "user message appended");
    }

    pub fn append_assistant_message(&mut self, text: &str) {
        self.messages.push(Message::assistant(text));
        debug!(len = self.messages.len(), "assistant message appended");
    }

    /// Removes the last message if it was sent by the user.
    ///
    /// Used to restore the pre-call state when a completion request fails.
    pub fn discard_last_user_message(&mut self) -> Option<Message> {
        if self.messages.last().map(|m| m.role) == Some(Role::User) {
            let removed = self.messages.pop();
            debug!(len = self.messages.len(), "pending user message discarded");
            removed
        } else {
            None
        }
    }

    /// Renders the ChatML prompt for the current state. See [`crate::prompt`].
    pub fn build_prompt(&self) -> String {
        render_prompt(&self.system_message, &self.messages)
    }

    /// Keeps at most `limit_turns` turns (`2 * limit_turns` messages), dropping
    /// the oldest. A limit of zero erases the history.
    pub fn trim_history(&mut self, limit_turns: usize) {
        let limit = limit_turns.saturating_mul(2);
        if self.messages.len() <= limit {
            return;
        }
        let before = self.messages.len();
        if limit_turns > 0 {
            let excess = before - limit;
            self.messages.drain(..excess);
        } else {
            self.messages.clear();
        }
        debug!(before, after = self.messages.len(), limit_turns, "history trimmed");
    }

    /// Sets the history limit and trims immediately. Raising the limit does
    /// not bring back dropped messages.
    pub fn set_history_limit(&mut self, turns: usize) {
        self.history_limit = turns;
        self.trim_history(turns);
    }

    pub fn set_system_message(&mut self, text: impl Into<String>) {
        self.system_message = text.into();
    }

    /// Affects user messages appended from now on; stored messages keep
    /// whatever prefix they were stored with.
    pub fn set_prefix_message(&mut self, text: impl Into<String>) {
        self.prefix_message = text.into();
    }

    /// Drops every message. System message, prefix, limit and usage totals
    /// are kept.
    pub fn clear_history(&mut self) {
        self.messages.clear();
        debug!("history cleared");
    }

    /// Prices one exchange and adds it to the running totals.
    pub fn record_usage(
        &mut self,
        prompt: &str,
        response: &str,
        counter: &dyn TokenCounter,
        price_per_1k_tokens: f64,
    ) -> TurnUsage {
        let turn = TurnUsage::compute(prompt, response, counter, price_per_1k_tokens);
        self.usage.add(turn);
        debug!(
            turn_tokens = turn.tokens,
            total_tokens = self.usage.tokens,
            total_price = self.usage.price,
            "usage recorded"
        );
        turn
    }

    /// Zeroes the token and price totals.
    pub fn reset_usage(&mut self) {
        self.usage = UsageTotals::default();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    pub fn system_message(&self) -> &str {
        &self.system_message
    }

    pub fn prefix_message(&self) -> &str {
        &self.prefix_message
    }

    pub fn usage(&self) -> UsageTotals {
        self.usage
    }
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::new(ConversationSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_with_turns(turns: usize) -> ConversationBuffer {
        let mut buffer = ConversationBuffer::new(ConversationSettings {
            history_turns: 10,
            ..Default::default()
        });
        for i in 0..turns {
            buffer.append_user_message(&format!("q{i}"));
            buffer.append_assistant_message(&format!("a{i}"));
        }
        buffer
    }

    #[test]
    fn test_prefix_is_joined_with_newline() {
        let mut buffer = ConversationBuffer::default();
        buffer.set_prefix_message("P");
        buffer.append_user_message("hello");
        assert_eq!(buffer.messages()[0].content, "P\nhello");
    }

    #[test]
    fn test_blank_prefix_is_ignored() {
        let mut buffer = ConversationBuffer::default();
        buffer.set_prefix_message("   \n");
        buffer.append_user_message("hello");
        assert_eq!(buffer.messages()[0].content, "hello");
    }

    #[test]
    fn test_prefix_change_is_not_retroactive() {
        let mut buffer = ConversationBuffer::default();
        buffer.set_prefix_message("old");
        buffer.append_user_message("first");
        buffer.set_prefix_message("");
        buffer.append_user_message("second");
        assert_eq!(buffer.messages()[0].content, "old\nfirst");
        assert_eq!(buffer.messages()[1].content, "second");
    }

    #[test]
    fn test_empty_user_text_is_stored() {
        let mut buffer = ConversationBuffer::default();
        buffer.append_user_message("");
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.messages()[0].content, "");
    }

    #[test]
    fn test_trim_keeps_last_pairs() {
        let mut buffer = buffer_with_turns(5);
        buffer.trim_history(2);
        let texts: Vec<_> = buffer.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["q3", "a3", "q4", "a4"]);
    }

    #[test]
    fn test_trim_to_zero_erases() {
        let mut buffer = buffer_with_turns(2);
        buffer.trim_history(0);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_trim_under_limit_is_noop() {
        let mut buffer = buffer_with_turns(2);
        buffer.trim_history(3);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_pending_user_message_counts_against_limit() {
        let mut buffer = buffer_with_turns(1);
        buffer.append_user_message("dangling");
        buffer.trim_history(1);
        let texts: Vec<_> = buffer.messages().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["a0", "dangling"]);
    }

    #[test]
    fn test_lowering_limit_trims_immediately() {
        let mut buffer = buffer_with_turns(4);
        buffer.set_history_limit(1);
        assert_eq!(buffer.history_limit(), 1);
        assert_eq!(buffer.len(), 2);
        buffer.set_history_limit(5);
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_discard_only_removes_trailing_user() {
        let mut buffer = buffer_with_turns(1);
        assert!(buffer.discard_last_user_message().is_none());
        assert_eq!(buffer.len(), 2);

        buffer.append_user_message("retry me");
        let removed = buffer.discard_last_user_message();
        assert_eq!(removed.map(|m| m.content), Some("retry me".to_string()));
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_clear_keeps_settings_and_usage() {
        let mut buffer = buffer_with_turns(2);
        buffer.set_system_message("S");
        buffer.set_prefix_message("P");
        buffer.record_usage("a b", "c", &|t: &str| t.split_whitespace().count(), 1.0);
        buffer.clear_history();

        assert!(buffer.is_empty());
        assert_eq!(buffer.system_message(), "S");
        assert_eq!(buffer.prefix_message(), "P");
        assert_eq!(buffer.history_limit(), 10);
        assert_eq!(buffer.usage().tokens, 3);
    }

    #[test]
    fn test_reset_usage_zeroes_totals() {
        let mut buffer = ConversationBuffer::default();
        buffer.record_usage("x", "y", &|_: &str| 100usize, 0.002);
        buffer.reset_usage();
        assert_eq!(buffer.usage(), UsageTotals::default());
    }
}
