//! BoxTokenizer / BoxCausalLm -- object-safe wrappers for the inference traits.
//!
//! Same blanket-impl pattern for both traits:
//! 1. Define an object-safe `*Dyn` trait with boxed futures
//! 2. Blanket-impl it for every implementor of the RPITIT trait
//! 3. The `Box*` type wraps `Box<dyn *Dyn>` and re-implements the RPITIT
//!    trait by delegation, so it plugs into generic code unchanged

use std::future::Future;
use std::pin::Pin;

use parley_types::error::InferenceError;
use parley_types::inference::{DecodeOptions, EncodeOptions, GenerateOptions, TokenBatch};

use super::provider::{CausalLm, Tokenizer};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, InferenceError>> + Send + 'a>>;

/// Object-safe version of [`Tokenizer`] with boxed futures.
pub trait TokenizerDyn: Send + Sync {
    fn name(&self) -> &str;

    fn eos_token_id(&self) -> u32;

    fn encode_boxed<'a>(&'a self, text: &'a str, options: EncodeOptions) -> BoxFuture<'a, Vec<u32>>;

    fn decode_boxed<'a>(&'a self, ids: &'a [u32], options: DecodeOptions) -> BoxFuture<'a, String>;
}

impl<T: Tokenizer> TokenizerDyn for T {
    fn name(&self) -> &str {
        Tokenizer::name(self)
    }

    fn eos_token_id(&self) -> u32 {
        Tokenizer::eos_token_id(self)
    }

    fn encode_boxed<'a>(&'a self, text: &'a str, options: EncodeOptions) -> BoxFuture<'a, Vec<u32>> {
        Box::pin(self.encode(text, options))
    }

    fn decode_boxed<'a>(&'a self, ids: &'a [u32], options: DecodeOptions) -> BoxFuture<'a, String> {
        Box::pin(self.decode(ids, options))
    }
}

/// Type-erased tokenizer for runtime backend selection.
pub struct BoxTokenizer {
    inner: Box<dyn TokenizerDyn>,
}

impl BoxTokenizer {
    pub fn new<T: Tokenizer + 'static>(tokenizer: T) -> Self {
        Self {
            inner: Box::new(tokenizer),
        }
    }
}

impl Tokenizer for BoxTokenizer {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn eos_token_id(&self) -> u32 {
        self.inner.eos_token_id()
    }

    async fn encode(&self, text: &str, options: EncodeOptions) -> Result<Vec<u32>, InferenceError> {
        self.inner.encode_boxed(text, options).await
    }

    async fn decode(&self, ids: &[u32], options: DecodeOptions) -> Result<String, InferenceError> {
        self.inner.decode_boxed(ids, options).await
    }
}

/// Object-safe version of [`CausalLm`] with boxed futures.
pub trait CausalLmDyn: Send + Sync {
    fn name(&self) -> &str;

    fn generate_boxed<'a>(
        &'a self,
        input: &'a TokenBatch,
        options: &'a GenerateOptions,
    ) -> BoxFuture<'a, TokenBatch>;
}

impl<T: CausalLm> CausalLmDyn for T {
    fn name(&self) -> &str {
        CausalLm::name(self)
    }

    fn generate_boxed<'a>(
        &'a self,
        input: &'a TokenBatch,
        options: &'a GenerateOptions,
    ) -> BoxFuture<'a, TokenBatch> {
        Box::pin(self.generate(input, options))
    }
}

/// Type-erased causal language model.
pub struct BoxCausalLm {
    inner: Box<dyn CausalLmDyn>,
}

impl BoxCausalLm {
    pub fn new<T: CausalLm + 'static>(model: T) -> Self {
        Self {
            inner: Box::new(model),
        }
    }
}

impl CausalLm for BoxCausalLm {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(
        &self,
        input: &TokenBatch,
        options: &GenerateOptions,
    ) -> Result<TokenBatch, InferenceError> {
        self.inner.generate_boxed(input, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::controller::{TurnController, TurnSettings};
    use crate::inference::scripted::{SCRIPTED_EOS, ScriptedModel, ScriptedTokenizer};
    use parley_types::chat::TurnOutcome;

    #[tokio::test]
    async fn test_boxed_backend_delegates() {
        let tokenizer = BoxTokenizer::new(ScriptedTokenizer::new());
        assert_eq!(Tokenizer::eos_token_id(&tokenizer), SCRIPTED_EOS);

        let ids = tokenizer.encode("ab", EncodeOptions::default()).await.unwrap();
        assert_eq!(ids, vec![97, 98]);

        let model = BoxCausalLm::new(ScriptedModel::replying("c"));
        assert_eq!(CausalLm::name(&model), "scripted");
        let options = GenerateOptions {
            max_new_tokens: 4,
            temperature: 0.7,
            top_p: 0.9,
            do_sample: true,
            eos_token_id: SCRIPTED_EOS,
        };
        let output = model.generate(&TokenBatch::from_ids(ids), &options).await.unwrap();
        assert_eq!(output.sequence(0), Some(&[97, 98, 99, SCRIPTED_EOS][..]));

        let text = tokenizer
            .decode(output.sequence(0).unwrap(), DecodeOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "abc");
    }

    #[tokio::test]
    async fn test_controller_runs_on_boxed_backend() {
        let mut ctl = TurnController::new(
            BoxTokenizer::new(ScriptedTokenizer::new()),
            BoxCausalLm::new(ScriptedModel::replying(" Hello there!")),
            TurnSettings::default(),
        );

        let outcome = ctl.handle_user_turn("hi").await;
        assert_eq!(
            outcome,
            TurnOutcome::Replied {
                reply: "Hello there!".to_string(),
                fallback: false,
            }
        );
        assert_eq!(ctl.buffer().len(), 2);
        assert_eq!(ctl.model_name(), "scripted");
    }
}
