//! # Story Annotator CLI (`anno`)
//!
//! The `anno` binary drives the annotation pipeline over a JSON story
//! store. All commands accept a `--config` flag pointing to a TOML
//! configuration file.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `anno chunk` | Split each story's text into overlapping chunks |
//! | `anno annotate embedding` | Embed every chunk without an embedding |
//! | `anno annotate timing` | Label each chunk's relationship phase |
//! | `anno annotate tactics` | Score each chunk for every catalog tactic |
//! | `anno stats` | Show store and annotation-coverage summary |
//!
//! ## Examples
//!
//! ```bash
//! # One-time chunking pass
//! anno chunk --config ./config/anno.toml
//!
//! # Annotate; safe to interrupt and re-run at any point
//! anno annotate timing --config ./config/anno.toml
//!
//! # Cap this run at 100 annotator calls (quota management)
//! anno annotate tactics --limit 100
//!
//! # See how much is left
//! anno annotate embedding --dry-run
//! anno stats
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use story_annotator::annotate_cmd::{self, AnnotateKind};
use story_annotator::chunk_cmd;
use story_annotator::config;
use story_annotator::progress::ProgressMode;
use story_annotator::stats;

/// Story Annotator — a resumable batch-annotation pipeline for story
/// corpora.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/anno.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "anno",
    about = "Story Annotator — a resumable batch-annotation pipeline for story corpora",
    version,
    long_about = "Story Annotator splits stories from a JSON document store into \
    bounded-length chunks and applies embedding, phase-label, and tactic-severity \
    annotations to each chunk exactly once. Runs are idempotent and resumable: the \
    store is rewritten after every processed chunk and already-annotated chunks are \
    skipped on re-run."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/anno.toml`. The store path, chunking sizes,
    /// annotator models, and rate limit are read from this file.
    #[arg(long, global = true, default_value = "./config/anno.toml")]
    config: PathBuf,

    /// Progress output on stderr: `auto` (human when stderr is a TTY),
    /// `off`, `human`, or `json`.
    #[arg(long, global = true, default_value = "auto")]
    progress: String,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Split each story's text into chunks.
    ///
    /// Runs the separator-boundary splitter over every story and writes the
    /// resulting chunks back to the store. Stories that already have chunks
    /// are skipped: re-splitting replaces a story's chunks wholesale,
    /// annotations included, so it must be requested explicitly.
    Chunk {
        /// Re-split stories that already have chunks (drops their annotations).
        #[arg(long)]
        force: bool,

        /// Show would-be chunk counts without writing to the store.
        #[arg(long)]
        dry_run: bool,
    },

    /// Apply one annotation kind across all chunks.
    ///
    /// Iterates stories and chunks in stored order, skipping chunks that
    /// already carry the annotation. The store is persisted after every
    /// processed chunk, so interrupting and re-running never redoes
    /// completed work. Requires `GOOGLE_API_KEY` (except with `--dry-run`).
    Annotate {
        /// Annotation kind: embedding, timing, or tactics.
        #[arg(value_enum)]
        kind: AnnotateKind,

        /// Only this tactic (tactics kind only), e.g. `gaslighting`.
        #[arg(long)]
        tactic: Option<String>,

        /// Maximum number of annotator calls in this run.
        #[arg(long)]
        limit: Option<usize>,

        /// Count pending chunks without calling the annotator.
        #[arg(long)]
        dry_run: bool,
    },

    /// Show store statistics and per-kind annotation coverage.
    Stats,
}

fn parse_progress(raw: &str) -> Result<ProgressMode> {
    match raw {
        "auto" => Ok(ProgressMode::default_for_tty()),
        "off" => Ok(ProgressMode::Off),
        "human" => Ok(ProgressMode::Human),
        "json" => Ok(ProgressMode::Json),
        other => anyhow::bail!(
            "Unknown progress mode: '{}'. Must be auto, off, human, or json.",
            other
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    let progress = parse_progress(&cli.progress)?;

    match cli.command {
        Commands::Chunk { force, dry_run } => {
            chunk_cmd::run_chunk(&cfg, force, dry_run)?;
        }
        Commands::Annotate {
            kind,
            tactic,
            limit,
            dry_run,
        } => {
            annotate_cmd::run_annotate(&cfg, kind, tactic, limit, dry_run, progress).await?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
    }

    Ok(())
}
