use thiserror::Error;

/// Errors from the tokenizer/model backend.
///
/// `Load` is terminal for the process; the per-turn variants are caught by
/// the turn controller and turned into a fixed apology.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("failed to load {what}: {message}")]
    Load { what: String, message: String },

    #[error("encode error: {0}")]
    Encode(String),

    #[error("generation error: {0}")]
    Generate(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("shape error: {0}")]
    Shape(String),

    #[error("generation timed out after {0}s")]
    Timeout(u64),
}

impl InferenceError {
    pub fn load(what: impl Into<String>, message: impl ToString) -> Self {
        InferenceError::Load {
            what: what.into(),
            message: message.to_string(),
        }
    }
}

/// Errors from the chat session guard.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a turn is already in progress")]
    Busy,

    /// The task running the turn panicked or was aborted.
    #[error("turn task failed: {0}")]
    TurnAborted(String),
}

/// Errors from reading an explicitly requested config file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {message}")]
    Parse { path: String, message: String },
}
