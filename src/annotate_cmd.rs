//! The `anno annotate` command: run the resumable pipeline for one
//! annotation kind.
//!
//! Wires together the store, the rate limiter, the configured annotators,
//! and the progress reporter, then hands control to [`crate::pipeline`].
//! `tactics` expands to one full pass per catalog tactic, matching the
//! per-tactic skip granularity inside `manipulation_tactics`.

use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;

use crate::annotator::{Annotator, EmbeddingAnnotator, TacticAnnotator, TimingAnnotator};
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::pipeline::{self, AnnotationSlot, RunSummary};
use crate::progress::ProgressMode;
use crate::rate_limit::RateLimiter;
use crate::store::{self, FilePersister, StoryStore};
use crate::tactics::{self, TacticDef};

/// Annotation kinds exposed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AnnotateKind {
    /// Embedding vector per chunk.
    Embedding,
    /// Relationship-phase label per chunk.
    Timing,
    /// Severity score per chunk for each catalog tactic.
    Tactics,
}

pub async fn run_annotate(
    config: &Config,
    kind: AnnotateKind,
    tactic: Option<String>,
    limit: Option<usize>,
    dry_run: bool,
    progress: ProgressMode,
) -> Result<()> {
    if !config.annotator.is_enabled() {
        bail!("Annotator provider is disabled. Set [annotator] provider in config.");
    }

    let selected = selected_tactics(kind, tactic.as_deref())?;
    let slots = slots_for(kind, &selected);

    let mut data = store::load(&config.store.path)?;

    if data.chunk_count() == 0 {
        println!("annotate");
        println!("  no chunks in store — run `anno chunk` first");
        return Ok(());
    }

    if dry_run {
        // Pending counts only; no credential or client needed.
        println!("annotate (dry-run)");
        println!("  chunks: {}", data.chunk_count());
        for slot in &slots {
            println!("  pending {}: {}", slot.label(), pending_count(&data, slot));
        }
        return Ok(());
    }

    let client = Arc::new(GeminiClient::from_env(config.annotator.timeout_secs)?);
    let mut limiter = RateLimiter::new(
        config.rate_limit.max_calls,
        Duration::from_secs(config.rate_limit.period_secs),
    );
    let mut persister = FilePersister::new(&config.store.path);
    let reporter = progress.reporter();

    let mut budget = limit;
    let mut total = RunSummary::default();

    for slot in &slots {
        if budget == Some(0) {
            break;
        }

        let annotator = annotator_for(config, &client, slot)?;
        let summary = pipeline::run(
            slot,
            annotator.as_ref(),
            &mut data,
            &mut persister,
            &mut limiter,
            reporter.as_ref(),
            budget,
        )
        .await?;

        println!("annotate {}", slot.label());
        println!("  annotated: {}", summary.annotated);
        println!("  skipped: {}", summary.skipped);
        println!("  failed: {}", summary.failed);

        let processed = (summary.annotated + summary.failed) as usize;
        budget = budget.map(|b| b.saturating_sub(processed));

        total.annotated += summary.annotated;
        total.skipped += summary.skipped;
        total.failed += summary.failed;
    }

    if slots.len() > 1 {
        println!("annotate total");
        println!("  annotated: {}", total.annotated);
        println!("  skipped: {}", total.skipped);
        println!("  failed: {}", total.failed);
    }
    println!("ok");

    Ok(())
}

/// Resolve the `--tactic` filter against the catalog. Only meaningful for
/// the tactics kind.
fn selected_tactics(
    kind: AnnotateKind,
    filter: Option<&str>,
) -> Result<Vec<&'static TacticDef>> {
    if kind != AnnotateKind::Tactics {
        if filter.is_some() {
            bail!("--tactic only applies to `annotate tactics`");
        }
        return Ok(Vec::new());
    }

    match filter {
        Some(name) => match tactics::find(name) {
            Some(tactic) => Ok(vec![tactic]),
            None => {
                let known: Vec<&str> = tactics::TACTICS.iter().map(|t| t.name).collect();
                bail!("Unknown tactic: '{}'. Known: {}", name, known.join(", "));
            }
        },
        None => Ok(tactics::TACTICS.iter().collect()),
    }
}

fn slots_for(kind: AnnotateKind, selected: &[&'static TacticDef]) -> Vec<AnnotationSlot> {
    match kind {
        AnnotateKind::Embedding => vec![AnnotationSlot::field("embedding")],
        AnnotateKind::Timing => vec![AnnotationSlot::field("timing")],
        AnnotateKind::Tactics => selected
            .iter()
            .map(|t| AnnotationSlot::keyed("manipulation_tactics", t.name))
            .collect(),
    }
}

fn annotator_for(
    config: &Config,
    client: &Arc<GeminiClient>,
    slot: &AnnotationSlot,
) -> Result<Box<dyn Annotator>> {
    match slot {
        AnnotationSlot::Field(name) if name == "embedding" => Ok(Box::new(
            EmbeddingAnnotator::new(
                Arc::clone(client),
                config.annotator.embed_model.clone(),
                config.annotator.dims,
            ),
        )),
        AnnotationSlot::Field(name) if name == "timing" => Ok(Box::new(TimingAnnotator::new(
            Arc::clone(client),
            config.annotator.timing_model.clone(),
        ))),
        AnnotationSlot::Keyed { key, .. } => match tactics::find(key) {
            Some(tactic) => Ok(Box::new(TacticAnnotator::new(
                Arc::clone(client),
                config.annotator.tactic_model.clone(),
                tactic,
            ))),
            None => bail!("Unknown tactic: '{}'", key),
        },
        AnnotationSlot::Field(name) => bail!("Unknown annotation kind: '{}'", name),
    }
}

fn pending_count(data: &StoryStore, slot: &AnnotationSlot) -> usize {
    data.stories
        .iter()
        .flat_map(|s| s.chunks.iter())
        .filter(|c| !slot.is_set(c))
        .count()
}
