//! Configuration types for Parley.
//!
//! `ChatConfig` represents the `config.toml` that selects the model files,
//! the sampling configuration, and how much history goes into each prompt.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::inference::GenerateOptions;

/// Top-level configuration. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub conversation: ConversationConfig,
}

/// Where the tokenizer and weights live.
///
/// Relative paths are resolved against the data directory by the loader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Display name shown in banners and logs.
    #[serde(default = "default_model_name")]
    pub name: String,

    /// HuggingFace `tokenizer.json`.
    #[serde(default = "default_tokenizer_path")]
    pub tokenizer_path: PathBuf,

    /// Quantized GGUF weights of a llama-architecture model.
    #[serde(default = "default_weights_path")]
    pub weights_path: PathBuf,

    /// Overrides end-of-sequence token discovery.
    #[serde(default)]
    pub eos_token: Option<String>,

    /// Sampling RNG seed.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

fn default_model_name() -> String {
    "tinyllama-1.1b-chat".to_string()
}

fn default_tokenizer_path() -> PathBuf {
    PathBuf::from("models/tokenizer.json")
}

fn default_weights_path() -> PathBuf {
    PathBuf::from("models/model.gguf")
}

fn default_seed() -> u64 {
    299_792_458
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model_name(),
            tokenizer_path: default_tokenizer_path(),
            weights_path: default_weights_path(),
            eos_token: None,
            seed: default_seed(),
        }
    }
}

/// Sampling configuration applied to every turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_new_tokens")]
    pub max_new_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    #[serde(default = "default_do_sample")]
    pub do_sample: bool,

    /// Upper bound on one generation call. Unbounded when absent.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_max_new_tokens() -> u32 {
    50
}

fn default_temperature() -> f64 {
    0.7
}

fn default_top_p() -> f64 {
    0.9
}

fn default_do_sample() -> bool {
    true
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: default_max_new_tokens(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            do_sample: default_do_sample(),
            timeout_secs: None,
        }
    }
}

impl GenerationConfig {
    /// Sampling options for one request, stopping at `eos_token_id`.
    pub fn options(&self, eos_token_id: u32) -> GenerateOptions {
        GenerateOptions {
            max_new_tokens: self.max_new_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            do_sample: self.do_sample,
            eos_token_id,
        }
    }
}

/// Conversation buffer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Number of most recent turns included in each prompt.
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

fn default_max_history() -> usize {
    6
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_history: default_max_history(),
        }
    }
}
