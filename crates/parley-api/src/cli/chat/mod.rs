//! Interactive terminal chat.
//!
//! Message bubbles (user right-aligned, bot left-aligned), a typing
//! indicator while the model generates, and slash commands. Entry point:
//! `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
