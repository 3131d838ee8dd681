//! `parley config` -- show the resolved configuration.

use std::path::Path;

use anyhow::Result;
use console::style;

use parley_infra::config::resolve_model_path;
use parley_types::config::ChatConfig;

/// Print where configuration came from, the resolved model files, and the
/// effective settings.
pub fn show_config(
    data_dir: &Path,
    explicit_path: Option<&Path>,
    config: &ChatConfig,
    json: bool,
) -> Result<()> {
    let source = explicit_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| data_dir.join("config.toml"));
    let tokenizer_path = resolve_model_path(data_dir, &config.model.tokenizer_path);
    let weights_path = resolve_model_path(data_dir, &config.model.weights_path);

    if json {
        let report = serde_json::json!({
            "data_dir": data_dir.display().to_string(),
            "config_file": source.display().to_string(),
            "config_file_exists": source.exists(),
            "tokenizer_path": tokenizer_path.display().to_string(),
            "weights_path": weights_path.display().to_string(),
            "config": config,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let exists = |p: &Path| {
        if p.exists() {
            format!("{}", style("found").green())
        } else {
            format!("{}", style("missing").red())
        }
    };

    println!();
    println!("  {}  {}", style("Data dir:").bold(), data_dir.display());
    println!(
        "  {}    {} ({})",
        style("Config:").bold(),
        source.display(),
        exists(&source)
    );
    println!(
        "  {} {} ({})",
        style("Tokenizer:").bold(),
        tokenizer_path.display(),
        exists(&tokenizer_path)
    );
    println!(
        "  {}   {} ({})",
        style("Weights:").bold(),
        weights_path.display(),
        exists(&weights_path)
    );
    println!();
    println!("{}", toml::to_string_pretty(config)?);

    Ok(())
}
