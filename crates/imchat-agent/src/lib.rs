//! Everything around the conversation buffer that talks to the outside
//! world: configuration and the model catalog, token estimation, the
//! completion backend and the controller tying them together.

pub mod backends;
pub mod config;
pub mod controller;
pub mod tokenizer;

pub use backends::{CompletionBackend, CompletionRequest, HttpCompletionBackend};
pub use config::{ApiType, ChatConfig, CompletionParams, EndpointConfig, ModelCatalog, ModelEntry};
pub use controller::{ChatController, Exchange};
pub use tokenizer::{HeuristicTokenizer, TokenizerFamily};
