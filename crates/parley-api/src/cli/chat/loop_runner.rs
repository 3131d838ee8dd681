//! Main chat loop orchestration.
//!
//! Welcome banner, then read -> (slash command | turn) -> render until the
//! user exits. Turns go through `ChatSession::handle`, which waits for the
//! single turn slot, so input submitted mid-turn is queued, not dropped.

use std::time::{Duration, Instant};

use console::style;
use tracing::{info, warn};

use parley_types::chat::{Role, TurnOutcome};

use crate::state::AppState;

use super::banner::print_welcome_banner;
use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};
use super::renderer::ChatRenderer;

/// Run the interactive chat loop.
pub async fn run_chat_loop(state: &AppState) -> anyhow::Result<()> {
    let session = &state.session;
    print_welcome_banner(
        state.model_name(),
        &session.id().to_string(),
        state.config.conversation.max_history,
    );

    let renderer = ChatRenderer::new();
    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut chat_input, _writer) =
        ChatInput::new(prompt).map_err(|e| anyhow::anyhow!("Failed to initialize input: {e}"))?;

    loop {
        let text = match chat_input.read_line().await {
            InputEvent::Eof => {
                println!("\n  {}", style("Session ended.").dim());
                break;
            }
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) => text,
        };

        if text.is_empty() {
            continue;
        }

        if let Some(cmd) = commands::parse(&text) {
            match cmd {
                ChatCommand::Help => commands::print_help(),
                ChatCommand::Clear => chat_input.clear(),
                ChatCommand::History => {
                    let history = session.history();
                    println!();
                    if history.is_empty() {
                        println!("  {}", style("No messages yet.").dim());
                    }
                    for turn in &history {
                        let label = match turn.role() {
                            Role::User => format!("{}", style("You").green()),
                            Role::Bot => format!("{}", style("Bot").cyan()),
                        };
                        renderer.print_history_line(&label, turn.content());
                    }
                    println!();
                }
                ChatCommand::Exit => {
                    println!("\n  {}", style("Session ended.").dim());
                    break;
                }
                ChatCommand::Unknown(name) => {
                    println!(
                        "\n  {} Unknown command: {}. Type /help for available commands.\n",
                        style("?").yellow().bold(),
                        style(name).dim()
                    );
                }
            }
            continue;
        }

        renderer.print_user(&text);

        let spinner = indicatif::ProgressBar::new_spinner();
        spinner.set_style(
            indicatif::ProgressStyle::default_spinner()
                .template("  {spinner:.cyan} {msg}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
        );
        spinner.set_message("Typing...");
        spinner.enable_steady_tick(Duration::from_millis(80));

        let start = Instant::now();
        let outcome = session.handle(&text).await;
        spinner.finish_and_clear();
        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Turn did not complete");
                eprintln!("\n  {} {e}\n", style("!").red().bold());
                continue;
            }
        };

        match &outcome {
            TurnOutcome::Ignored => {}
            TurnOutcome::Replied { reply, .. } => renderer.print_bot(reply),
            TurnOutcome::Failed { message, .. } => renderer.print_apology(message),
        }
        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            failed = outcome.is_failure(),
            "Turn rendered"
        );
    }

    chat_input.flush();
    info!(
        session_id = %session.id(),
        exchanges = session.exchange_count(),
        failures = session.failure_count(),
        "Chat session closed"
    );
    Ok(())
}
