//! Conversation state and turn orchestration for Parley.
//!
//! This crate defines the inference "ports" (tokenizer and model traits)
//! that the infrastructure layer implements, the conversation buffer, and
//! the turn controller that drives one exchange. It depends only on
//! `parley-types` -- never on `parley-infra` or any inference library.

pub mod chat;
pub mod conversation;
pub mod inference;
