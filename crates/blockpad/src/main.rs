use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use blockpad_mod_history::{EditorHost, HistoryConfig, MemoryHost, UndoEngine};

mod script;

use script::{Script, Step};

/// Headless driver for the block editor undo/redo engine.
#[derive(Parser, Debug)]
#[command(name = "blockpad", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a scripted editing session and print each history state.
    Replay {
        /// JSON script: a list of steps, or `{ "initial": ..., "steps": [...] }`.
        script: PathBuf,

        /// History config file (JSON). Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Replay { script, config } => {
            let config = config
                .map(|path| HistoryConfig::load(&path))
                .unwrap_or_default();
            let script = Script::load(&script)?;
            for line in replay(script, config).await? {
                println!("{line}");
            }
        }
    }
    Ok(())
}

/// Runs every step against an in-memory host and returns one JSON state
/// line per step.
async fn replay(script: Script, config: HistoryConfig) -> Result<Vec<String>> {
    tracing::info!(steps = script.steps.len(), "Replaying session");

    let initial = script.initial.into_blocks();
    let host = Arc::new(MemoryHost::new(initial.clone()));
    let engine = UndoEngine::new(Arc::clone(&host) as Arc<dyn EditorHost>, config, None);
    engine.initialize(initial)?;

    let mut lines = Vec::with_capacity(script.steps.len());
    for (index, step) in script.steps.into_iter().enumerate() {
        match step {
            Step::Edit { blocks, caret } => {
                host.set_blocks(blocks.into_blocks());
                match caret {
                    Some(caret) => host.place_caret(caret.block, caret.point()),
                    None => host.clear_caret(),
                }
                engine
                    .notify_changed()
                    .await
                    .with_context(|| format!("Step {index}: capture failed"))?;
            }
            Step::Undo => engine
                .undo()
                .await
                .with_context(|| format!("Step {index}: undo failed"))?,
            Step::Redo => engine
                .redo()
                .await
                .with_context(|| format!("Step {index}: redo failed"))?,
        }
        lines.push(serde_json::to_string(&engine.state())?);
    }
    Ok(lines)
}
