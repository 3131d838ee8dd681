//! Scripted tokenizer and model doubles.
//!
//! The tokenizer maps UTF-8 bytes to ids `0..=255` and reserves `256` as
//! the end-of-sequence token, so decoded output reads back exactly what
//! was encoded. The model appends a scripted reply to the prompt ids, the
//! way a real causal model returns prompt plus continuation.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use parley_types::error::InferenceError;
use parley_types::inference::{DecodeOptions, EncodeOptions, GenerateOptions, TokenBatch};

use super::provider::{CausalLm, Tokenizer};

/// End-of-sequence id used by the scripted tokenizer.
pub const SCRIPTED_EOS: u32 = 256;

/// Byte-level tokenizer with switchable failures. Clones share counters.
#[derive(Clone, Default)]
pub struct ScriptedTokenizer {
    fail_encode: bool,
    fail_decode: bool,
    encode_calls: Arc<AtomicUsize>,
    decode_calls: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_encode(mut self) -> Self {
        self.fail_encode = true;
        self
    }

    pub fn failing_decode(mut self) -> Self {
        self.fail_decode = true;
        self
    }

    pub fn encode_calls(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }

    pub fn decode_calls(&self) -> usize {
        self.decode_calls.load(Ordering::SeqCst)
    }

    /// Every prompt passed to `encode`, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl Tokenizer for ScriptedTokenizer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn eos_token_id(&self) -> u32 {
        SCRIPTED_EOS
    }

    async fn encode(&self, text: &str, _options: EncodeOptions) -> Result<Vec<u32>, InferenceError> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(text.to_string());
        }
        if self.fail_encode {
            return Err(InferenceError::Encode("scripted encode failure".to_string()));
        }
        Ok(text.bytes().map(u32::from).collect())
    }

    async fn decode(&self, ids: &[u32], options: DecodeOptions) -> Result<String, InferenceError> {
        self.decode_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_decode {
            return Err(InferenceError::Decode("scripted decode failure".to_string()));
        }
        let mut bytes = Vec::with_capacity(ids.len());
        for &id in ids {
            match u8::try_from(id) {
                Ok(byte) => bytes.push(byte),
                Err(_) if options.skip_special_tokens => {}
                Err(_) => bytes.extend_from_slice(b"</s>"),
            }
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Model that continues each prompt with the next scripted reply.
#[derive(Clone)]
pub struct ScriptedModel {
    replies: Arc<Mutex<VecDeque<String>>>,
    default_reply: String,
    fail: bool,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
    last_options: Arc<Mutex<Option<GenerateOptions>>>,
}

impl ScriptedModel {
    /// A model that always continues with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::new())),
            default_reply: reply.into(),
            fail: false,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            last_options: Arc::new(Mutex::new(None)),
        }
    }

    /// Queue replies used before falling back to the default reply.
    pub fn then(self, reply: impl Into<String>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply.into());
        }
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Sleep before answering, to hold a turn in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_options(&self) -> Option<GenerateOptions> {
        self.last_options.lock().ok().and_then(|o| o.clone())
    }

    fn next_reply(&self) -> String {
        self.replies
            .lock()
            .ok()
            .and_then(|mut r| r.pop_front())
            .unwrap_or_else(|| self.default_reply.clone())
    }
}

impl CausalLm for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        input: &TokenBatch,
        options: &GenerateOptions,
    ) -> Result<TokenBatch, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_options.lock() {
            *last = Some(options.clone());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(InferenceError::Generate("scripted generation failure".to_string()));
        }

        let reply = self.next_reply();
        let mut continuation: Vec<u32> = reply
            .bytes()
            .map(u32::from)
            .take(options.max_new_tokens as usize)
            .collect();
        if continuation.len() < options.max_new_tokens as usize {
            continuation.push(options.eos_token_id);
        }

        let rows = (0..input.batch_size())
            .filter_map(|i| input.sequence(i))
            .map(|prompt| {
                let mut row = prompt.to_vec();
                row.extend_from_slice(&continuation);
                row
            })
            .collect();
        TokenBatch::from_sequences(rows)
    }
}
