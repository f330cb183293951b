use crate::tokenizer::TokenizerFamily;
use imchat_core::{ImChatError, ImChatResult};
use imchat_session::{ConversationSettings, DEFAULT_SYSTEM_MESSAGE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Environment variable consulted when the config file leaves `api_key` empty.
pub const API_KEY_ENV: &str = "IMCHAT_API_KEY";

/// Flavour of the completions endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiType {
    /// Azure OpenAI deployments (`api-key` header, `api-version` query).
    #[default]
    Azure,
    /// OpenAI-compatible `/v1/completions` (bearer auth, model in the body).
    OpenAi,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    #[serde(default)]
    pub api_type: ApiType,
    pub endpoint: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl EndpointConfig {
    /// Completions URL for the given model (deployment name on Azure).
    pub fn completions_url(&self, model: &str) -> String {
        let base = self.endpoint.trim_end_matches('/');
        match self.api_type {
            ApiType::Azure => format!(
                "{base}/openai/deployments/{model}/completions?api-version={}",
                self.api_version
            ),
            ApiType::OpenAi => format!("{base}/v1/completions"),
        }
    }
}

/// Sampling parameters that stay fixed for the whole session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionParams {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default)]
    pub frequency_penalty: f32,
    #[serde(default)]
    pub presence_penalty: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

/// One selectable model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    #[serde(default)]
    pub price_per_1k_tokens: f64,
    #[serde(default)]
    pub tokenizer: TokenizerFamily,
}

/// Lookup table from model name to pricing and tokenizer, built once at
/// startup.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    entries: Vec<ModelEntry>,
    index: HashMap<String, usize>,
}

impl ModelCatalog {
    pub fn new(entries: Vec<ModelEntry>) -> ImChatResult<Self> {
        let mut index = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            if entry.name.trim().is_empty() {
                return Err(ImChatError::Config("model name must not be empty".into()));
            }
            if !entry.price_per_1k_tokens.is_finite() || entry.price_per_1k_tokens < 0.0 {
                return Err(ImChatError::Config(format!(
                    "model '{}' has an invalid price: {}",
                    entry.name, entry.price_per_1k_tokens
                )));
            }
            if index.insert(entry.name.clone(), i).is_some() {
                return Err(ImChatError::Config(format!(
                    "model '{}' is listed twice",
                    entry.name
                )));
            }
        }
        Ok(Self { entries, index })
    }

    pub fn resolve(&self, name: &str) -> ImChatResult<&ModelEntry> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| ImChatError::UnknownModel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Entries in configuration order.
    pub fn iter(&self) -> impl Iterator<Item = &ModelEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Top-level configuration, usually read from `imchat.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    pub endpoint: EndpointConfig,
    pub models: Vec<ModelEntry>,
    pub default_model: String,
    #[serde(default = "default_history_turns")]
    pub default_history_turns: usize,
    #[serde(default = "default_temperature")]
    pub default_temperature: f32,
    #[serde(default = "default_system_message")]
    pub system_message: String,
    #[serde(default)]
    pub prefix_message: String,
    #[serde(default)]
    pub completion: CompletionParams,
}

fn default_api_version() -> String {
    "2022-12-01".to_string()
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    1000
}

fn default_top_p() -> f32 {
    0.95
}

fn default_history_turns() -> usize {
    3
}

fn default_temperature() -> f32 {
    0.5
}

fn default_system_message() -> String {
    DEFAULT_SYSTEM_MESSAGE.to_string()
}

impl ChatConfig {
    pub fn from_toml_str(raw: &str) -> ImChatResult<Self> {
        toml::from_str(raw).map_err(|e| ImChatError::Config(e.to_string()))
    }

    /// Reads and parses a TOML file. Does not validate.
    pub async fn load(path: &Path) -> ImChatResult<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            ImChatError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Fills an empty `api_key` from `lookup(API_KEY_ENV)`.
    pub fn fill_api_key_with<F>(&mut self, lookup: F)
    where
        F: FnOnce(&str) -> Option<String>,
    {
        if self.endpoint.api_key.trim().is_empty() {
            if let Some(key) = lookup(API_KEY_ENV) {
                self.endpoint.api_key = key;
            }
        }
    }

    /// [`fill_api_key_with`](Self::fill_api_key_with) backed by the process
    /// environment.
    pub fn fill_api_key_from_env(&mut self) {
        self.fill_api_key_with(|name| std::env::var(name).ok());
    }

    pub fn catalog(&self) -> ImChatResult<ModelCatalog> {
        ModelCatalog::new(self.models.clone())
    }

    pub fn validate(&self) -> ImChatResult<()> {
        if self.endpoint.endpoint.trim().is_empty() {
            return Err(ImChatError::Config("endpoint must not be empty".into()));
        }
        if self.endpoint.request_timeout_secs == 0 {
            return Err(ImChatError::Config(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        let catalog = self.catalog()?;
        if catalog.is_empty() {
            return Err(ImChatError::Config("at least one model is required".into()));
        }
        if !catalog.contains(&self.default_model) {
            return Err(ImChatError::Config(format!(
                "default_model '{}' is not in the model list",
                self.default_model
            )));
        }
        validate_temperature(self.default_temperature)?;
        if !(0.0..=1.0).contains(&self.completion.top_p) {
            return Err(ImChatError::Config(format!(
                "top_p must be within [0, 1], got {}",
                self.completion.top_p
            )));
        }
        if self.completion.max_tokens == 0 {
            return Err(ImChatError::Config("max_tokens must be positive".into()));
        }
        Ok(())
    }

    /// Initial buffer settings derived from this configuration.
    pub fn conversation_settings(&self) -> ConversationSettings {
        ConversationSettings {
            system_message: self.system_message.clone(),
            prefix_message: self.prefix_message.clone(),
            history_turns: self.default_history_turns,
        }
    }
}

pub(crate) fn validate_temperature(value: f32) -> ImChatResult<()> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ImChatError::Config(format!(
            "temperature must be within [0, 1], got {value}"
        )))
    }
}
