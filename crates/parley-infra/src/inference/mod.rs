//! Local inference backend: HuggingFace tokenizer + quantized GGUF model.

pub mod quantized;
pub mod tokenizer;

use std::path::Path;

use parley_core::inference::{BoxCausalLm, BoxTokenizer, Tokenizer};
use parley_types::config::ChatConfig;
use parley_types::error::InferenceError;

use crate::config::resolve_model_path;

pub use quantized::{QuantizedLlm, load_model};
pub use tokenizer::{HfTokenizer, load_tokenizer};

/// Load the tokenizer and model named by `config`, concurrently.
///
/// Either failure is terminal: the caller shows the load-failure banner.
pub async fn load_backend(
    config: &ChatConfig,
    data_dir: &Path,
) -> Result<(BoxTokenizer, BoxCausalLm), InferenceError> {
    let tokenizer_path = resolve_model_path(data_dir, &config.model.tokenizer_path);
    let weights_path = resolve_model_path(data_dir, &config.model.weights_path);

    let (tokenizer, model) = tokio::try_join!(
        load_tokenizer(tokenizer_path, config.model.eos_token.clone()),
        load_model(config.model.name.clone(), weights_path, config.model.seed),
    )?;

    tracing::info!(
        model = %config.model.name,
        eos_token_id = tokenizer.eos_token_id(),
        "Inference backend ready"
    );

    Ok((BoxTokenizer::new(tokenizer), BoxCausalLm::new(model)))
}
