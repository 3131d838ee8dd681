//! Request/response shapes exchanged with the inference backend.
//!
//! These model the tokenizer and model calls a turn makes: encode options,
//! decode options, sampling options, and the batched token ids the model
//! consumes and produces.

use serde::{Deserialize, Serialize};

use crate::error::InferenceError;

/// Options for turning prompt text into token ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeOptions {
    pub add_special_tokens: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            add_special_tokens: true,
        }
    }
}

/// Options for turning token ids back into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    pub skip_special_tokens: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            skip_special_tokens: true,
        }
    }
}

/// Sampling configuration for one generation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateOptions {
    pub max_new_tokens: u32,
    pub temperature: f64,
    pub top_p: f64,
    pub do_sample: bool,
    /// Generation stops once this token is produced.
    pub eos_token_id: u32,
}

/// Token ids laid out as `[batch, seq_len]`, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBatch {
    data: Vec<u32>,
    shape: [usize; 2],
}

impl TokenBatch {
    /// Build a flat batch of shape `[1, ids.len()]` from one id sequence.
    pub fn from_ids(ids: Vec<u32>) -> Self {
        let len = ids.len();
        Self {
            data: ids,
            shape: [1, len],
        }
    }

    /// Build a batch from several sequences of equal length.
    pub fn from_sequences(sequences: Vec<Vec<u32>>) -> Result<Self, InferenceError> {
        let rows = sequences.len();
        let cols = sequences.first().map(Vec::len).unwrap_or(0);
        if sequences.iter().any(|s| s.len() != cols) {
            return Err(InferenceError::Shape(
                "sequences in a batch must have equal length".to_string(),
            ));
        }
        Ok(Self {
            data: sequences.into_iter().flatten().collect(),
            shape: [rows, cols],
        })
    }

    /// Reinterpret the ids under a new shape with the same element count.
    pub fn reshape(self, shape: [usize; 2]) -> Result<Self, InferenceError> {
        let expected = shape[0]
            .checked_mul(shape[1])
            .ok_or_else(|| InferenceError::Shape(format!("shape {shape:?} overflows usize")))?;
        if expected != self.data.len() {
            return Err(InferenceError::Shape(format!(
                "cannot reshape {} ids into {:?}",
                self.data.len(),
                shape
            )));
        }
        Ok(Self {
            data: self.data,
            shape,
        })
    }

    pub fn shape(&self) -> [usize; 2] {
        self.shape
    }

    pub fn batch_size(&self) -> usize {
        self.shape[0]
    }

    pub fn seq_len(&self) -> usize {
        self.shape[1]
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }

    /// The `index`-th row, if present.
    pub fn sequence(&self, index: usize) -> Option<&[u32]> {
        if index >= self.batch_size() {
            return None;
        }
        let cols = self.seq_len();
        Some(&self.data[index * cols..(index + 1) * cols])
    }
}
