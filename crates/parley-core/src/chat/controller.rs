//! Turn controller.
//!
//! Runs one request/response cycle: record the user turn, build the prompt,
//! encode -> generate -> decode through the injected backend, extract the
//! reply, and record the bot turn. Every backend call is caught locally;
//! a failure ends the turn with its stage's apology and records no bot turn.

use std::time::Duration;

use tracing::{Instrument, debug, info_span, warn};

use parley_types::chat::{FailureStage, Role, TurnOutcome};
use parley_types::config::{ChatConfig, GenerationConfig};
use parley_types::error::InferenceError;
use parley_types::inference::{DecodeOptions, EncodeOptions, TokenBatch};

use crate::conversation::ConversationBuffer;
use crate::inference::{CausalLm, Tokenizer};

use super::reply::{FALLBACK_REPLY, apology, extract_reply};

/// Per-turn settings taken from configuration.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    /// Turns included in each prompt. Always at least 1.
    pub max_history: usize,
    pub generation: GenerationConfig,
}

impl TurnSettings {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            max_history: config.conversation.max_history.max(1),
            generation: config.generation.clone(),
        }
    }
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

/// A backend call that failed, tagged with its stage.
struct StageFailure {
    stage: FailureStage,
    error: InferenceError,
}

impl StageFailure {
    fn at(stage: FailureStage) -> impl FnOnce(InferenceError) -> Self {
        move |error| Self { stage, error }
    }
}

/// Owns the conversation and drives the inference backend, one turn at a time.
///
/// Generic over `Tokenizer` and `CausalLm` so tests can inject scripted
/// doubles and the binary can inject boxed real backends.
pub struct TurnController<T: Tokenizer, M: CausalLm> {
    buffer: ConversationBuffer,
    tokenizer: T,
    model: M,
    settings: TurnSettings,
}

impl<T: Tokenizer, M: CausalLm> TurnController<T, M> {
    pub fn new(tokenizer: T, model: M, settings: TurnSettings) -> Self {
        Self {
            buffer: ConversationBuffer::new(),
            tokenizer,
            model,
            settings,
        }
    }

    pub fn buffer(&self) -> &ConversationBuffer {
        &self.buffer
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    /// Handle one user submission.
    ///
    /// Empty (after trimming) input is ignored without touching the backend.
    /// Otherwise exactly one user turn is recorded, and a bot turn is
    /// recorded only if encode, generate and decode all succeed.
    pub async fn handle_user_turn(&mut self, user_text: &str) -> TurnOutcome {
        let text = user_text.trim();
        if text.is_empty() {
            debug!("Ignoring empty user input");
            return TurnOutcome::Ignored;
        }

        self.buffer.append(Role::User, text);
        let prompt = self.buffer.to_prompt(self.settings.max_history);

        let span = info_span!(
            "gen_ai.turn",
            gen_ai.system = self.tokenizer.name(),
            gen_ai.request.model = self.model.name(),
            gen_ai.request.max_tokens = self.settings.generation.max_new_tokens,
            gen_ai.request.temperature = self.settings.generation.temperature,
            conversation.turns = self.buffer.len(),
        );

        let result = self.run_pipeline(&prompt).instrument(span).await;

        match result {
            Ok(decoded) => {
                let (reply, fallback) = match extract_reply(&decoded) {
                    Some(reply) => (reply, false),
                    None => {
                        debug!(decoded_len = decoded.len(), "No reply after cue marker, using fallback");
                        (FALLBACK_REPLY.to_string(), true)
                    }
                };
                self.buffer.append(Role::Bot, reply.clone());
                TurnOutcome::Replied { reply, fallback }
            }
            Err(failure) => {
                warn!(stage = %failure.stage, error = %failure.error, "Turn failed");
                TurnOutcome::Failed {
                    stage: failure.stage,
                    message: apology(failure.stage).to_string(),
                }
            }
        }
    }

    /// encode -> generate -> decode. Returns the raw decoded text.
    async fn run_pipeline(&self, prompt: &str) -> Result<String, StageFailure> {
        let ids = self
            .tokenizer
            .encode(prompt, EncodeOptions { add_special_tokens: true })
            .await
            .map_err(StageFailure::at(FailureStage::Encode))?;
        debug!(prompt_tokens = ids.len(), "Prompt encoded");

        let input = TokenBatch::from_ids(ids);
        let options = self
            .settings
            .generation
            .options(self.tokenizer.eos_token_id());

        let generation = self.model.generate(&input, &options);
        let output = match self.settings.generation.timeout_secs {
            Some(secs) => tokio::time::timeout(Duration::from_secs(secs), generation)
                .await
                .unwrap_or_else(|_| Err(InferenceError::Timeout(secs))),
            None => generation.await,
        }
        .map_err(StageFailure::at(FailureStage::Generate))?;

        let sequence = output.sequence(0).ok_or_else(|| StageFailure {
            stage: FailureStage::Generate,
            error: InferenceError::Generate("model returned no sequences".to_string()),
        })?;
        debug!(
            output_tokens = sequence.len().saturating_sub(input.seq_len()),
            "Generation finished"
        );

        self.tokenizer
            .decode(sequence, DecodeOptions { skip_special_tokens: true })
            .await
            .map_err(StageFailure::at(FailureStage::Decode))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::reply::{APOLOGY_DECODE, APOLOGY_ENCODE, APOLOGY_GENERATE};
    use crate::inference::scripted::{SCRIPTED_EOS, ScriptedModel, ScriptedTokenizer};
    use parley_types::chat::Turn;

    fn controller(
        tokenizer: ScriptedTokenizer,
        model: ScriptedModel,
    ) -> TurnController<ScriptedTokenizer, ScriptedModel> {
        TurnController::new(tokenizer, model, TurnSettings::default())
    }

    #[tokio::test]
    async fn test_successful_turn_records_both_turns() {
        let mut ctl = controller(ScriptedTokenizer::new(), ScriptedModel::replying(" Hello there!"));

        let outcome = ctl.handle_user_turn("  hi  ").await;

        assert_eq!(
            outcome,
            TurnOutcome::Replied {
                reply: "Hello there!".to_string(),
                fallback: false
            }
        );
        assert_eq!(ctl.buffer().turns(), &[Turn::user("hi"), Turn::bot("Hello there!")]);
    }

    #[tokio::test]
    async fn test_prompt_sent_to_tokenizer() {
        let tokenizer = ScriptedTokenizer::new();
        let mut ctl = controller(tokenizer.clone(), ScriptedModel::replying(" ok"));

        ctl.handle_user_turn("hi").await;
        ctl.handle_user_turn("bye").await;

        assert_eq!(
            tokenizer.prompts(),
            vec![
                "User: hi\nBot:".to_string(),
                "User: hi\nBot: ok\nUser: bye\nBot:".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_input_is_ignored() {
        let tokenizer = ScriptedTokenizer::new();
        let model = ScriptedModel::replying(" hi");
        let mut ctl = controller(tokenizer.clone(), model.clone());

        let outcome = ctl.handle_user_turn("   \n\t").await;

        assert_eq!(outcome, TurnOutcome::Ignored);
        assert!(ctl.buffer().is_empty());
        assert_eq!(tokenizer.encode_calls(), 0);
        assert_eq!(model.calls(), 0);
        assert_eq!(tokenizer.decode_calls(), 0);
    }

    #[tokio::test]
    async fn test_encode_failure_keeps_user_turn_only() {
        let model = ScriptedModel::replying(" hi");
        let mut ctl = controller(ScriptedTokenizer::new().failing_encode(), model.clone());

        let outcome = ctl.handle_user_turn("hello").await;

        assert_eq!(outcome.display_text(), Some(APOLOGY_ENCODE));
        assert!(matches!(
            outcome,
            TurnOutcome::Failed {
                stage: FailureStage::Encode,
                ..
            }
        ));
        assert_eq!(ctl.buffer().len(), 1);
        assert_eq!(ctl.buffer().turns()[0], Turn::user("hello"));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_failure() {
        let tokenizer = ScriptedTokenizer::new();
        let mut ctl = controller(tokenizer.clone(), ScriptedModel::replying(" hi").failing());

        let outcome = ctl.handle_user_turn("hello").await;

        assert_eq!(outcome.display_text(), Some(APOLOGY_GENERATE));
        assert_eq!(ctl.buffer().len(), 1);
        assert_eq!(tokenizer.decode_calls(), 0);
    }

    #[tokio::test]
    async fn test_decode_failure() {
        let mut ctl = controller(
            ScriptedTokenizer::new().failing_decode(),
            ScriptedModel::replying(" hi"),
        );

        let outcome = ctl.handle_user_turn("hello").await;

        assert_eq!(outcome.display_text(), Some(APOLOGY_DECODE));
        assert_eq!(ctl.buffer().len(), 1);
    }

    #[tokio::test]
    async fn test_session_continues_after_failure() {
        let mut ctl = controller(ScriptedTokenizer::new(), ScriptedModel::replying(" fine"));
        ctl.handle_user_turn("one").await;
        ctl.handle_user_turn("two").await;
        assert_eq!(ctl.buffer().len(), 4);

        let mut failing = controller(ScriptedTokenizer::new(), ScriptedModel::replying(" x").failing());
        failing.handle_user_turn("a").await;
        failing.handle_user_turn("b").await;
        assert_eq!(failing.buffer().len(), 2);
        assert!(failing.buffer().turns().iter().all(|t| t.role() == Role::User));
    }

    #[tokio::test]
    async fn test_fallback_when_reply_is_empty() {
        let mut ctl = controller(ScriptedTokenizer::new(), ScriptedModel::replying("   "));

        let outcome = ctl.handle_user_turn("hi").await;

        assert_eq!(
            outcome,
            TurnOutcome::Replied {
                reply: FALLBACK_REPLY.to_string(),
                fallback: true
            }
        );
        assert_eq!(ctl.buffer().turns()[1], Turn::bot(FALLBACK_REPLY));
    }

    #[tokio::test]
    async fn test_generation_options() {
        let model = ScriptedModel::replying(" hi");
        let mut ctl = controller(ScriptedTokenizer::new(), model.clone());

        ctl.handle_user_turn("hello").await;

        let options = model.last_options().unwrap();
        assert_eq!(options.max_new_tokens, 50);
        assert!((options.temperature - 0.7).abs() < f64::EPSILON);
        assert!((options.top_p - 0.9).abs() < f64::EPSILON);
        assert!(options.do_sample);
        assert_eq!(options.eos_token_id, SCRIPTED_EOS);
    }

    #[tokio::test]
    async fn test_generation_timeout_maps_to_generate_apology() {
        let mut settings = TurnSettings::default();
        settings.generation.timeout_secs = Some(1);
        let model = ScriptedModel::replying(" late").with_delay(Duration::from_secs(5));
        let mut ctl = TurnController::new(ScriptedTokenizer::new(), model, settings);

        let outcome = ctl.handle_user_turn("hello").await;

        assert_eq!(outcome.display_text(), Some(APOLOGY_GENERATE));
        assert_eq!(ctl.buffer().len(), 1);
    }

    #[tokio::test]
    async fn test_max_history_limits_prompt() {
        let tokenizer = ScriptedTokenizer::new();
        let mut config = ChatConfig::default();
        config.conversation.max_history = 2;
        let mut ctl = TurnController::new(
            tokenizer.clone(),
            ScriptedModel::replying(" ok"),
            TurnSettings::from_config(&config),
        );

        ctl.handle_user_turn("first").await;
        ctl.handle_user_turn("second").await;

        assert_eq!(tokenizer.prompts()[1], "Bot: ok\nUser: second\nBot:");
    }

    #[test]
    fn test_zero_history_is_clamped() {
        let mut config = ChatConfig::default();
        config.conversation.max_history = 0;
        assert_eq!(TurnSettings::from_config(&config).max_history, 1);
    }
}
