//! Conversation state for imchat.
//!
//! [`ConversationBuffer`] owns the ordered message history, the system and
//! prefix messages and the history limit, renders the ChatML prompt sent to
//! the completion endpoint and keeps running token/price totals.

pub mod buffer;
pub mod prompt;
pub mod usage;

pub use buffer::{ConversationBuffer, ConversationSettings, DEFAULT_SYSTEM_MESSAGE};
pub use prompt::{render_prompt, ASSISTANT_CUE, STOP_SEQUENCE};
pub use usage::{TokenCounter, TurnUsage, UsageTotals};
