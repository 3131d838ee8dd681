//! HuggingFace `tokenizer.json` backed [`Tokenizer`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parley_core::inference::Tokenizer;
use parley_types::error::InferenceError;
use parley_types::inference::{DecodeOptions, EncodeOptions};

/// End-of-sequence tokens tried in order when no override is configured.
const EOS_CANDIDATES: &[&str] = &["<|end|>", "<|endoftext|>", "<|im_end|>", "<|eot_id|>", "</s>"];

pub struct HfTokenizer {
    inner: Arc<tokenizers::Tokenizer>,
    eos_token_id: u32,
}

impl HfTokenizer {
    /// Parse a `tokenizer.json` and resolve its end-of-sequence id.
    pub fn from_file(path: &Path, eos_token: Option<&str>) -> Result<Self, InferenceError> {
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| InferenceError::load("tokenizer", format!("{}: {e}", path.display())))?;
        Self::from_tokenizer(inner, eos_token)
    }

    fn from_tokenizer(
        inner: tokenizers::Tokenizer,
        eos_token: Option<&str>,
    ) -> Result<Self, InferenceError> {
        let eos_token_id = match eos_token {
            Some(token) => inner.token_to_id(token).ok_or_else(|| {
                InferenceError::load("tokenizer", format!("eos token '{token}' not in vocabulary"))
            })?,
            None => EOS_CANDIDATES
                .iter()
                .find_map(|token| inner.token_to_id(token))
                .ok_or_else(|| {
                    InferenceError::load(
                        "tokenizer",
                        "no end-of-sequence token found; set model.eos_token",
                    )
                })?,
        };

        Ok(Self {
            inner: Arc::new(inner),
            eos_token_id,
        })
    }
}

/// Load a tokenizer off the async runtime.
pub async fn load_tokenizer(
    path: PathBuf,
    eos_token: Option<String>,
) -> Result<HfTokenizer, InferenceError> {
    tracing::info!(path = %path.display(), "Loading tokenizer");
    tokio::task::spawn_blocking(move || HfTokenizer::from_file(&path, eos_token.as_deref()))
        .await
        .map_err(|e| InferenceError::load("tokenizer", e))?
}

impl Tokenizer for HfTokenizer {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }

    async fn encode(&self, text: &str, options: EncodeOptions) -> Result<Vec<u32>, InferenceError> {
        let encoding = self
            .inner
            .encode(text, options.add_special_tokens)
            .map_err(|e| InferenceError::Encode(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    async fn decode(&self, ids: &[u32], options: DecodeOptions) -> Result<String, InferenceError> {
        self.inner
            .decode(ids, options.skip_special_tokens)
            .map_err(|e| InferenceError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokenizers::models::wordlevel::WordLevel;
    use tokenizers::pre_tokenizers::whitespace::Whitespace;

    fn word_level(words: &[&str]) -> tokenizers::Tokenizer {
        let vocab: HashMap<String, u32> = words
            .iter()
            .enumerate()
            .map(|(i, w)| (w.to_string(), i as u32))
            .collect();
        let model = WordLevel::builder()
            .vocab(vocab.into_iter().collect())
            .unk_token("[UNK]".to_string())
            .build()
            .unwrap();
        let mut tokenizer = tokenizers::Tokenizer::new(model);
        tokenizer.with_pre_tokenizer(Some(Whitespace {}));
        tokenizer
    }

    #[test]
    fn test_eos_discovery_prefers_candidates_in_order() {
        let tok = HfTokenizer::from_tokenizer(word_level(&["[UNK]", "</s>", "<|end|>"]), None).unwrap();
        assert_eq!(tok.eos_token_id, 2);
    }

    #[test]
    fn test_eos_override() {
        let tok =
            HfTokenizer::from_tokenizer(word_level(&["[UNK]", "</s>", "<stop>"]), Some("<stop>")).unwrap();
        assert_eq!(tok.eos_token_id, 2);
    }

    #[test]
    fn test_missing_eos_is_load_error() {
        let err = HfTokenizer::from_tokenizer(word_level(&["[UNK]", "hello"]), None).err().unwrap();
        assert!(matches!(err, InferenceError::Load { .. }));
    }

    #[tokio::test]
    async fn test_encode_decode_through_trait() {
        let tok = HfTokenizer::from_tokenizer(word_level(&["[UNK]", "</s>", "hello", "world"]), None)
            .unwrap();
        let ids = tok.encode("hello world", EncodeOptions::default()).await.unwrap();
        assert_eq!(ids, vec![2, 3]);
        let text = tok.decode(&ids, DecodeOptions::default()).await.unwrap();
        assert_eq!(text, "hello world");
    }

    #[tokio::test]
    async fn test_missing_file_is_load_error() {
        let err = load_tokenizer(PathBuf::from("/nonexistent/tokenizer.json"), None)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().starts_with("failed to load tokenizer"));
    }
}
