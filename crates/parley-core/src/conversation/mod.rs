//! Ordered log of conversation turns and prompt construction.

pub mod buffer;

pub use buffer::{ConversationBuffer, CUE_MARKER};
