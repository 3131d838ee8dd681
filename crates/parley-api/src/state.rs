//! Application state shared by the terminal chat and the REST API.
//!
//! The session is generic over the inference traits; `AppState` pins it to
//! the boxed backends so the real model and scripted doubles share one type.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use console::style;

use parley_core::chat::controller::{TurnController, TurnSettings};
use parley_core::chat::reply::LOAD_FAILURE_BANNER;
use parley_core::chat::session::ChatSession;
use parley_core::inference::{BoxCausalLm, BoxTokenizer};
use parley_infra::inference::load_backend;
use parley_types::config::ChatConfig;

/// Chat session pinned to the type-erased backend.
pub type ConcreteChatSession = ChatSession<BoxTokenizer, BoxCausalLm>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<ConcreteChatSession>,
    pub config: Arc<ChatConfig>,
}

impl AppState {
    /// Load the tokenizer and model, then wire a fresh chat session.
    ///
    /// On load failure the fixed banner is printed and the error returned,
    /// so the process exits non-zero.
    pub async fn init(
        data_dir: &Path,
        config: ChatConfig,
        show_progress: bool,
    ) -> anyhow::Result<Self> {
        let spinner = show_progress.then(|| {
            let spinner = indicatif::ProgressBar::new_spinner();
            spinner.set_style(
                indicatif::ProgressStyle::default_spinner()
                    .template("  {spinner:.cyan} {msg}")
                    .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner()),
            );
            spinner.set_message("Loading model, please wait...");
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner
        });

        let loaded = load_backend(&config, data_dir).await;

        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        match loaded {
            Ok((tokenizer, model)) => Ok(Self::from_backend(tokenizer, model, config)),
            Err(e) => {
                tracing::error!(error = %e, "Model load failed");
                eprintln!("\n  {} {}", style("!").red().bold(), LOAD_FAILURE_BANNER);
                Err(e.into())
            }
        }
    }

    /// Wire a session around already loaded backends.
    pub fn from_backend(
        tokenizer: BoxTokenizer,
        model: BoxCausalLm,
        config: ChatConfig,
    ) -> Self {
        let controller = TurnController::new(tokenizer, model, TurnSettings::from_config(&config));
        Self {
            session: Arc::new(ChatSession::new(controller)),
            config: Arc::new(config),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.config.model.name
    }
}
