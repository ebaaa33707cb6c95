mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "codegrade-cli")]
#[command(about = "CodeGrade CLI - Manage the language table and try code against the execution service", long_about = None)]
struct Cli {
    /// Path to languages.json
    #[arg(long, global = true, default_value = codegrade_common::config::DEFAULT_LANGUAGES_PATH)]
    languages: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default language table
    Init {
        /// Overwrite an existing languages.json
        #[arg(long, default_value = "false")]
        force: bool,
    },

    /// List configured languages
    Languages,

    /// Add a language to the table
    AddLang {
        /// Language name as callers will send it (e.g., go, rust)
        #[arg(short, long)]
        name: String,

        /// Execution-service language identifier
        #[arg(short, long)]
        id: u32,
    },

    /// Execute a source file once
    Run {
        /// Language name
        #[arg(short, long)]
        language: String,

        /// Source file
        #[arg(short, long)]
        file: PathBuf,

        /// Text passed on stdin
        #[arg(short, long, default_value = "")]
        stdin: String,
    },

    /// Evaluate a source file against a local problem definition without storing anything
    Preview {
        /// Problem JSON (title, test_cases, ...)
        #[arg(short, long)]
        problem: PathBuf,

        /// Language name
        #[arg(short, long)]
        language: String,

        /// Source file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Check connectivity with the execution service
    Selftest,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => {
            commands::init_languages(&cli.languages, force)?;
        }
        Commands::Languages => {
            commands::list_languages(&cli.languages)?;
        }
        Commands::AddLang { name, id } => {
            commands::add_language(&cli.languages, &name, id)?;
        }
        Commands::Run { language, file, stdin } => {
            commands::run_file(&cli.languages, &language, &file, &stdin).await?;
        }
        Commands::Preview { problem, language, file } => {
            commands::preview_problem(&cli.languages, &problem, &language, &file).await?;
        }
        Commands::Selftest => {
            commands::selftest(&cli.languages).await?;
        }
    }

    Ok(())
}
