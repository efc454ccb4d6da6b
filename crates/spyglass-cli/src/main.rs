// Copyright 2026 Spyglass Contributors
// SPDX-License-Identifier: Apache-2.0

//! Spyglass CLI entry point.

use std::io::Read;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;

use spyglass::progress::{self, ProgressReceiver};
use spyglass::{Pipeline, PipelineResult, SpyglassConfig};
use spyglass_cli::{load_config, missing_hosts_hint, render_human, render_json};

#[derive(Parser)]
#[command(
    name = "spyglass",
    about = "Fetch, parse and score spy reports",
    version
)]
struct Cli {
    /// Path to a JSON config file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Print the result as JSON.
    #[arg(long, global = true)]
    json: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a spy report by URL, then parse and score it. Ctrl-C cancels.
    Fetch {
        /// Link to the spy report on the game host.
        url: String,
    },

    /// Parse and score a saved report page (stdin when no file is given).
    Parse {
        /// File holding the report markup.
        file: Option<PathBuf>,

        /// URL the markup was copied from.
        #[arg(long)]
        source_url: Option<String>,
    },

    /// Generate shell completion scripts.
    ///
    /// Examples:
    ///   spyglass completions bash > ~/.local/share/bash-completion/completions/spyglass
    ///   spyglass completions zsh > ~/.zfunc/_spyglass
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish).
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "spyglass", &mut std::io::stdout());
            return Ok(());
        }

        Commands::Fetch { url } => {
            let config = load_config(cli.config.as_deref())?;
            if let Some(hint) = missing_hosts_hint(&config) {
                eprintln!("{hint}");
            }
            let pipeline = build_pipeline(&config)?;
            let cancel = async {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling");
                } else {
                    std::future::pending::<()>().await;
                }
            };
            pipeline.submit_by_url_with_cancel(&url, cancel).await
        }

        Commands::Parse { file, source_url } => {
            let markup = match file {
                Some(path) => std::fs::read_to_string(&path)?,
                None => {
                    let mut buf = String::new();
                    std::io::stdin().read_to_string(&mut buf)?;
                    buf
                }
            };
            let pipeline = build_pipeline(&load_config(cli.config.as_deref())?)?;
            pipeline.submit_by_markup(markup, source_url).await
        }
    };

    print_result(&result, cli.json)?;
    if !result.success() {
        std::process::exit(1);
    }
    Ok(())
}

fn build_pipeline(config: &SpyglassConfig) -> anyhow::Result<Pipeline> {
    let (tx, _) = progress::channel();
    let pipeline = Pipeline::from_config(config)?.with_progress(tx);
    if let Some(rx) = pipeline.subscribe() {
        tokio::spawn(log_progress(rx));
    }
    Ok(pipeline)
}

/// Forward progress events to the log.
async fn log_progress(mut rx: ProgressReceiver) {
    use tokio::sync::broadcast::error::RecvError;
    loop {
        match rx.recv().await {
            Ok(event) => tracing::info!("{}", event.event),
            Err(RecvError::Lagged(n)) => tracing::debug!("Dropped {n} progress events"),
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_result(result: &PipelineResult, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", render_json(result)?);
    } else {
        print!("{}", render_human(result));
    }
    Ok(())
}
