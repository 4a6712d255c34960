//! The resumable annotation loop.
//!
//! Applies one annotation slot across every chunk of every story exactly
//! once. Chunks that already carry the slot are skipped without invoking
//! the annotator, which is what makes a run resumable: after a crash or
//! quota exhaustion, re-running does only the remaining work.
//!
//! The store is persisted after every processed chunk — on success with the
//! new value included, on failure as-is so earlier progress from the run
//! survives. A per-chunk failure never aborts the loop; only a persistence
//! failure does.

use anyhow::Result;
use serde_json::Value;

use crate::annotator::{Annotator, ChunkContext};
use crate::progress::{AnnotateProgressEvent, ProgressReporter};
use crate::rate_limit::RateLimiter;
use crate::store::{Chunk, StorePersister, StoryStore};

/// Where an annotation value lands on a chunk.
pub enum AnnotationSlot {
    /// A top-level annotation key (`embedding`, `timing`).
    Field(String),
    /// A key inside a top-level object annotation
    /// (`manipulation_tactics.gaslighting`). The skip check is on the inner
    /// key, so each tactic gets its own full pass.
    Keyed { field: String, key: String },
}

impl AnnotationSlot {
    pub fn field(name: impl Into<String>) -> Self {
        AnnotationSlot::Field(name.into())
    }

    pub fn keyed(field: impl Into<String>, key: impl Into<String>) -> Self {
        AnnotationSlot::Keyed {
            field: field.into(),
            key: key.into(),
        }
    }

    /// Label used in progress output and summaries.
    pub fn label(&self) -> String {
        match self {
            AnnotationSlot::Field(name) => name.clone(),
            AnnotationSlot::Keyed { field, key } => format!("{}.{}", field, key),
        }
    }

    /// Membership check that makes the pipeline idempotent.
    pub fn is_set(&self, chunk: &Chunk) -> bool {
        match self {
            AnnotationSlot::Field(name) => chunk.annotations.contains_key(name),
            AnnotationSlot::Keyed { field, key } => chunk
                .annotations
                .get(field)
                .and_then(Value::as_object)
                .map_or(false, |map| map.contains_key(key)),
        }
    }

    pub fn set(&self, chunk: &mut Chunk, value: Value) {
        match self {
            AnnotationSlot::Field(name) => {
                chunk.annotations.insert(name.clone(), value);
            }
            AnnotationSlot::Keyed { field, key } => {
                let entry = chunk
                    .annotations
                    .entry(field.clone())
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
                if !matches!(entry, Value::Object(_)) {
                    *entry = Value::Object(serde_json::Map::new());
                }
                if let Value::Object(map) = entry {
                    map.insert(key.clone(), value);
                }
            }
        }
    }
}

/// Counts for one pipeline run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub annotated: u64,
    pub skipped: u64,
    pub failed: u64,
}

/// Apply `annotator` to every chunk missing `slot`, persisting after each
/// processed chunk. `limit` caps the number of processed (not skipped)
/// chunks in this run.
pub async fn run(
    slot: &AnnotationSlot,
    annotator: &dyn Annotator,
    store: &mut StoryStore,
    persister: &mut dyn StorePersister,
    limiter: &mut RateLimiter,
    reporter: &dyn ProgressReporter,
    limit: Option<usize>,
) -> Result<RunSummary> {
    let kind = slot.label();
    let stories = store.stories.len();
    let mut summary = RunSummary::default();
    let mut processed = 0usize;

    'stories: for s in 0..stories {
        reporter.report(AnnotateProgressEvent::Story {
            kind: kind.clone(),
            story: s + 1,
            stories,
        });

        let chunks = store.stories[s].chunks.len();
        for c in 0..chunks {
            if limit.is_some_and(|max| processed >= max) {
                break 'stories;
            }

            if slot.is_set(&store.stories[s].chunks[c]) {
                summary.skipped += 1;
                reporter.report(AnnotateProgressEvent::Skipped {
                    kind: kind.clone(),
                    story: s + 1,
                    chunk: c + 1,
                    chunks,
                });
                continue;
            }

            let chunk_text = store.stories[s].chunks[c].content.clone();
            let story_text = store.stories[s].content.clone();
            let ctx = ChunkContext {
                story: s + 1,
                chunk: c + 1,
                chunk_text: &chunk_text,
                story_text: &story_text,
            };

            limiter.acquire().await;

            match annotator.annotate(&ctx).await {
                Ok(value) => {
                    slot.set(&mut store.stories[s].chunks[c], value);
                    persister.persist(store)?;
                    summary.annotated += 1;
                    reporter.report(AnnotateProgressEvent::Annotated {
                        kind: kind.clone(),
                        story: s + 1,
                        chunk: c + 1,
                        chunks,
                    });
                }
                Err(e) => {
                    // Flush earlier progress from this run before moving on;
                    // the chunk stays unannotated and is retried next time.
                    persister.persist(store)?;
                    summary.failed += 1;
                    reporter.report(AnnotateProgressEvent::Failed {
                        kind: kind.clone(),
                        story: s + 1,
                        chunk: c + 1,
                        chunks,
                        error: format!("{:#}", e),
                    });
                }
            }
            processed += 1;
        }
    }

    Ok(summary)
}
