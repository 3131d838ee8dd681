//! Inference backend abstractions for Parley.
//!
//! - `Tokenizer` / `CausalLm`: RPITIT traits for concrete backends
//! - `BoxTokenizer` / `BoxCausalLm`: object-safe wrappers for dynamic dispatch

pub mod box_backend;
pub mod provider;
#[cfg(any(test, feature = "test-support"))]
pub mod scripted;

pub use box_backend::{BoxCausalLm, BoxTokenizer};
pub use provider::{CausalLm, Tokenizer};
