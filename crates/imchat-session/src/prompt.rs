//! ChatML prompt rendering.
//!
//! The layout produced here is the contract with the completion endpoint:
//!
//! ```text
//! <|im_start|>system
//! {system}
//! <|im_end|>
//! <|im_start|>{sender}
//! {text}
//! <|im_end|>
//! ...
//! <|im_start|>assistant
//! ```
//!
//! Newline placement is significant; the model stops generating at
//! [`STOP_SEQUENCE`].

use imchat_core::{Message, Role};

/// Opens a section.
pub const IM_START: &str = "<|im_start|>";
/// Closes a section.
pub const IM_END: &str = "<|im_end|>";
/// Stop sequence passed with every completion request.
pub const STOP_SEQUENCE: &str = IM_END;
/// Trailing cue asking the model to speak as the assistant.
pub const ASSISTANT_CUE: &str = "\n<|im_start|>assistant\n";

/// The leading system section. Not preceded by a newline.
pub fn system_section(content: &str) -> String {
    format!("{IM_START}system\n{content}\n{IM_END}")
}

/// One message section, always preceded by a newline.
pub fn turn_section(role: Role, text: &str) -> String {
    format!("\n{IM_START}{role}\n{text}\n{IM_END}")
}

/// Renders the full prompt: system section, every message in order, then the
/// assistant cue.
pub fn render_prompt(system_message: &str, messages: &[Message]) -> String {
    let mut prompt = system_section(system_message);
    for message in messages {
        prompt.push_str(&turn_section(message.role, &message.content));
    }
    prompt.push_str(ASSISTANT_CUE);
    prompt
}
