//! Core types and error definitions for imchat.
//!
//! This crate provides the foundational types shared across all imchat crates:
//! the unified error type and the message representation stored in a
//! conversation.
//!
//! # Main types
//!
//! - [`ImChatError`] — Unified error enum for all imchat subsystems.
//! - [`ImChatResult`] — Convenience alias for `Result<T, ImChatError>`.
//! - [`Role`] — Message sender (user or assistant).
//! - [`Message`] — A single message within a conversation.

/// Error type and result alias.
pub mod error;
/// Message and role types.
pub mod message;

pub use error::{ImChatError, ImChatResult};
pub use message::{Message, Role};
