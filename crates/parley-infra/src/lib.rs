//! Infrastructure layer for Parley.
//!
//! Contains implementations of the inference traits defined in
//! `parley-core` (HuggingFace tokenizers + candle quantized GGUF models),
//! plus config file loading and data directory resolution.

pub mod config;
pub mod inference;
