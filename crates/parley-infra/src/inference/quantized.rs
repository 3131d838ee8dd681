//! Quantized GGUF causal model backed by candle.
//!
//! Generation runs on a blocking thread: prefill the whole prompt at
//! position 0, then feed one sampled token at a time until the
//! end-of-sequence token or the new-token limit. Dropping the `generate`
//! future (a turn timeout) raises a cancel flag the loop checks before
//! every forward pass, so an abandoned generation releases the model.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use candle_core::quantized::gguf_file;
use candle_core::{DType, Device, Tensor};
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::quantized_llama::ModelWeights;

use parley_core::inference::CausalLm;
use parley_types::error::InferenceError;
use parley_types::inference::{GenerateOptions, TokenBatch};

/// Temperatures at or below this sample greedily.
const MIN_TEMPERATURE: f64 = 1e-7;

/// Raises the shared flag when dropped.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

pub struct QuantizedLlm {
    name: String,
    weights: Arc<Mutex<ModelWeights>>,
    device: Device,
    seed: u64,
    /// Advances the sampling seed so repeated prompts differ.
    generations: AtomicU64,
}

/// Load GGUF weights off the async runtime.
pub async fn load_model(
    name: String,
    path: PathBuf,
    seed: u64,
) -> Result<QuantizedLlm, InferenceError> {
    tracing::info!(model = %name, path = %path.display(), "Loading model weights");
    tokio::task::spawn_blocking(move || {
        let device = Device::Cpu;
        let mut file = std::fs::File::open(&path)
            .map_err(|e| InferenceError::load("model", format!("{}: {e}", path.display())))?;
        let content = gguf_file::Content::read(&mut file)
            .map_err(|e| InferenceError::load("model", format!("gguf parse: {e}")))?;
        let weights = ModelWeights::from_gguf(content, &mut file, &device)
            .map_err(|e| InferenceError::load("model", e))?;

        Ok(QuantizedLlm {
            name,
            weights: Arc::new(Mutex::new(weights)),
            device,
            seed,
            generations: AtomicU64::new(0),
        })
    })
    .await
    .map_err(|e| InferenceError::load("model", e))?
}

impl CausalLm for QuantizedLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        input: &TokenBatch,
        options: &GenerateOptions,
    ) -> Result<TokenBatch, InferenceError> {
        if input.batch_size() != 1 {
            return Err(InferenceError::Shape(format!(
                "expected a single sequence, got batch of {}",
                input.batch_size()
            )));
        }
        let prompt = input.sequence(0).unwrap_or_default().to_vec();
        if prompt.is_empty() {
            return Err(InferenceError::Generate("prompt produced zero tokens".to_string()));
        }

        let weights = Arc::clone(&self.weights);
        let device = self.device.clone();
        let options = options.clone();
        let seed = self
            .seed
            .wrapping_add(self.generations.fetch_add(1, Ordering::Relaxed));

        let cancel = Arc::new(AtomicBool::new(false));
        let _cancel_guard = CancelOnDrop(Arc::clone(&cancel));

        let started = std::time::Instant::now();
        let sequence = tokio::task::spawn_blocking(move || {
            run_generation(&weights, &device, seed, prompt, &options, &cancel)
        })
        .await
        .map_err(|e| InferenceError::Generate(e.to_string()))??;

        tracing::debug!(
            tokens = sequence.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Generation complete"
        );
        Ok(TokenBatch::from_ids(sequence))
    }
}

fn candle_error(e: candle_core::Error) -> InferenceError {
    InferenceError::Generate(e.to_string())
}

fn ensure_live(cancel: &AtomicBool) -> Result<(), InferenceError> {
    if cancel.load(Ordering::Acquire) {
        return Err(InferenceError::Generate("generation cancelled".to_string()));
    }
    Ok(())
}

/// Autoregressive loop. Returns the prompt followed by the generated ids.
fn run_generation(
    weights: &Mutex<ModelWeights>,
    device: &Device,
    seed: u64,
    prompt: Vec<u32>,
    options: &GenerateOptions,
    cancel: &AtomicBool,
) -> Result<Vec<u32>, InferenceError> {
    ensure_live(cancel)?;
    let mut model = weights
        .lock()
        .map_err(|_| InferenceError::Generate("model lock poisoned".to_string()))?;

    let temperature = (options.do_sample && options.temperature > MIN_TEMPERATURE)
        .then_some(options.temperature);
    let top_p = options.do_sample.then_some(options.top_p);
    let mut sampler = LogitsProcessor::new(seed, temperature, top_p);

    let prompt_len = prompt.len();
    let max_new = options.max_new_tokens as usize;
    let mut tokens = prompt;
    if max_new == 0 {
        return Ok(tokens);
    }

    // Prefill: the whole prompt at position 0 also resets the KV cache.
    let input = Tensor::new(tokens.as_slice(), device)
        .and_then(|t| t.unsqueeze(0))
        .map_err(candle_error)?;
    let mut next = sample_next(&mut model, &mut sampler, &input, 0)?;

    for step in 0..max_new {
        tokens.push(next);
        if next == options.eos_token_id || step + 1 == max_new {
            break;
        }
        ensure_live(cancel)?;
        let input = Tensor::new(&[next], device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(candle_error)?;
        next = sample_next(&mut model, &mut sampler, &input, prompt_len + step)?;
    }

    Ok(tokens)
}

fn sample_next(
    model: &mut ModelWeights,
    sampler: &mut LogitsProcessor,
    input: &Tensor,
    index_pos: usize,
) -> Result<u32, InferenceError> {
    let logits = model
        .forward(input, index_pos)
        .and_then(|l| l.squeeze(0))
        .and_then(|l| l.to_dtype(DType::F32))
        .map_err(candle_error)?;
    sampler.sample(&logits).map_err(candle_error)
}
