//! Shared domain types for Parley.
//!
//! Conversation turns, turn outcomes, the options exchanged with the
//! inference backend, configuration, and their error types.
//!
//! Zero infrastructure dependencies -- only serde and thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod inference;
