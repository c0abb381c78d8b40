use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::{json, Value};

use tmbridge_core::bridge::Bridge;
use tmbridge_core::config::{default_config_path, load_config, BridgeConfig};
use tmbridge_core::host::FsExtensionHost;
use tmbridge_core::inference::infer_builtin_language_ids;
use tmbridge_core::registry::{Registered, RegistrySnapshot};
use tmbridge_core::watcher::ExtensionWatcher;

#[derive(Parser)]
#[command(name = "tmbridge", about = "Resolve editor language and theme contributions for TextMate highlighters")]
struct Cli {
    /// Config file (default: ~/.tmbridge/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Extension root directory; repeat to scan several
    #[arg(long = "extensions-dir", global = true)]
    extensions_dirs: Vec<PathBuf>,

    /// Log filter, e.g. `debug` or `tmbridge_core=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print resolved language registrations as JSON
    Languages {
        /// Language ids or aliases (default: every known language)
        ids: Vec<String>,
    },
    /// Print the resolved theme as JSON `[id, registration]`
    Theme {
        /// Theme id or label (default: configured color theme)
        name: Option<String>,
    },
    /// Print the language id for a file extension
    Detect { extension: String },
    /// Print the raw contributions registered under a key
    Inspect { kind: InspectKind, key: String },
    /// Re-resolve whenever the installed extensions change
    Watch {
        /// Debounce window in milliseconds
        #[arg(long, default_value = "500")]
        debounce_ms: u64,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InspectKind {
    Language,
    Grammar,
    Scope,
    Theme,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(default_config_path);
    let mut config = match &config_path {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };
    if !cli.extensions_dirs.is_empty() {
        config.extension_dirs = cli.extensions_dirs.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_level))
                .context("invalid log level")?,
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(roots = ?config.extension_dirs, "starting tmbridge");

    let host = FsExtensionHost::new(config.extension_dirs.clone())
        .with_color_theme(config.color_theme.clone());
    let bridge = Bridge::new(Arc::new(host)).with_plain_text_language(config.plain_text_language.clone());

    match cli.command {
        Command::Languages { ids } => {
            let ids = (!ids.is_empty()).then_some(ids);
            let resolution = bridge.resolve_languages(ids.as_deref()).await?;
            let builtins = infer_builtin_language_ids(&resolution.registrations);
            print_json(&json!({
                "registrations": resolution.registrations,
                "unresolved": resolution.unresolved,
                "builtins": builtins,
            }))?;
        }
        Command::Theme { name } => {
            let resolution = bridge.resolve_theme(name.as_deref()).await?;
            print_json(&resolution)?;
        }
        Command::Detect { extension } => {
            let resolution = bridge.resolve_languages(None).await?;
            let extension = if extension.starts_with('.') {
                extension
            } else {
                format!(".{extension}")
            };
            println!("{}", bridge.resolve_extension_to_language(&resolution, &extension));
        }
        Command::Inspect { kind, key } => {
            let snapshot = bridge.snapshot()?;
            print_json(&inspect(&snapshot, kind, &key))?;
        }
        Command::Watch { debounce_ms } => {
            watch(&bridge, &config.extension_dirs, debounce_ms).await?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn registered_json<T: Serialize>(entry: &Registered<T>) -> Value {
    json!({
        "extension": &*entry.source_key,
        "base": entry.base().display().to_string(),
        "contribution": entry.contribution,
    })
}

fn inspect(snapshot: &RegistrySnapshot, kind: InspectKind, key: &str) -> Value {
    match kind {
        InspectKind::Language => {
            let id = snapshot.languages.resolve_alias(key);
            json!({
                "id": id,
                "aliases": snapshot.languages.aliases(&id),
                "contributions": snapshot
                    .languages
                    .language_contributions(&id)
                    .iter()
                    .map(registered_json)
                    .collect::<Vec<_>>(),
            })
        }
        InspectKind::Grammar => {
            let id = snapshot.languages.resolve_alias(key);
            json!({
                "id": id,
                "contributions": snapshot
                    .languages
                    .grammar_contributions(&id)
                    .iter()
                    .map(registered_json)
                    .collect::<Vec<_>>(),
            })
        }
        InspectKind::Scope => json!({
            "scopeName": key,
            "contributions": snapshot
                .languages
                .scope_contributions(key)
                .iter()
                .map(registered_json)
                .collect::<Vec<_>>(),
        }),
        InspectKind::Theme => {
            let id = snapshot.themes.resolve_label_to_id(key);
            json!({
                "id": id,
                "labels": snapshot.themes.labels(&id),
                "contribution": snapshot.themes.get(&id).map(registered_json),
            })
        }
    }
}

async fn watch(bridge: &Bridge, roots: &[PathBuf], debounce_ms: u64) -> anyhow::Result<()> {
    let watcher = ExtensionWatcher::new(roots, debounce_ms)?;
    tracing::info!(roots = ?roots, "watching extension roots");
    summarize(bridge).await?;

    loop {
        let changed = tokio::task::block_in_place(|| watcher.wait_for_changes(Duration::from_secs(60)));
        if changed.is_empty() {
            continue;
        }
        tracing::debug!(paths = changed.len(), "extension roots changed");
        match bridge.refresh() {
            Ok(true) => summarize(bridge).await?,
            Ok(false) => tracing::debug!("extension set unchanged"),
            Err(e) => tracing::warn!(error = %e, "failed to re-scan extensions"),
        }
    }
}

async fn summarize(bridge: &Bridge) -> anyhow::Result<()> {
    let snapshot = bridge.snapshot()?;
    let languages = bridge.resolve_languages(None).await?;
    let theme = bridge.resolve_theme(None).await?;
    print_json(&json!({
        "fingerprint": snapshot.fingerprint,
        "languages": snapshot.languages.language_ids().len(),
        "themes": snapshot.themes.theme_ids().len(),
        "registrations": languages.registrations.len(),
        "unresolved": languages.unresolved,
        "theme": theme.id(),
    }))
}
