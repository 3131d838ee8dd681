//! Tokenizer and CausalLm trait definitions.
//!
//! These are the capability set a turn needs from the inference library:
//! text <-> token ids, and autoregressive generation over token ids.
//! Implementations live in parley-infra (e.g., `HfTokenizer`,
//! `QuantizedLlm`); tests use scripted doubles.

use std::future::Future;

use parley_types::error::InferenceError;
use parley_types::inference::{DecodeOptions, EncodeOptions, GenerateOptions, TokenBatch};

/// Converts between prompt text and token ids.
pub trait Tokenizer: Send + Sync {
    /// Human-readable backend name (e.g., "huggingface").
    fn name(&self) -> &str;

    /// Id of the end-of-sequence token, used to stop generation.
    fn eos_token_id(&self) -> u32;

    fn encode(
        &self,
        text: &str,
        options: EncodeOptions,
    ) -> impl Future<Output = Result<Vec<u32>, InferenceError>> + Send;

    fn decode(
        &self,
        ids: &[u32],
        options: DecodeOptions,
    ) -> impl Future<Output = Result<String, InferenceError>> + Send;
}

/// A causal language model that continues token sequences.
pub trait CausalLm: Send + Sync {
    /// Human-readable model name.
    fn name(&self) -> &str;

    /// Continue every sequence in `input`.
    ///
    /// Returns full sequences (prompt ids followed by generated ids), one
    /// row per input row.
    fn generate(
        &self,
        input: &TokenBatch,
        options: &GenerateOptions,
    ) -> impl Future<Output = Result<TokenBatch, InferenceError>> + Send;
}
