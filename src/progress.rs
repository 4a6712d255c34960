//! Annotation progress reporting.
//!
//! Reports per-chunk progress during `anno annotate` so users can watch a
//! long, rate-limited run advance, and see which chunks were skipped or
//! failed. Progress is emitted on **stderr** so stdout remains parseable
//! for scripts.

use std::io::Write;

/// A single progress event for an annotation run.
#[derive(Clone, Debug)]
pub enum AnnotateProgressEvent {
    /// Entering a story.
    Story {
        kind: String,
        story: usize,
        stories: usize,
    },
    /// Chunk already carried this annotation kind; the annotator was not called.
    Skipped {
        kind: String,
        story: usize,
        chunk: usize,
        chunks: usize,
    },
    /// Chunk annotated and the store persisted.
    Annotated {
        kind: String,
        story: usize,
        chunk: usize,
        chunks: usize,
    },
    /// Annotator failed; earlier progress persisted, chunk left unannotated.
    Failed {
        kind: String,
        story: usize,
        chunk: usize,
        chunks: usize,
        error: String,
    },
}

/// Reports annotation progress. Implementations write to stderr (human or JSON).
pub trait ProgressReporter: Send + Sync {
    /// Emit a progress event. Called from the pipeline loop.
    fn report(&self, event: AnnotateProgressEvent);
}

/// Human-friendly progress on stderr:
/// "annotate timing  story 2/12  chunk 5/40  annotated".
pub struct StderrProgress;

impl ProgressReporter for StderrProgress {
    fn report(&self, event: AnnotateProgressEvent) {
        let line = match &event {
            AnnotateProgressEvent::Story {
                kind,
                story,
                stories,
            } => {
                format!("annotate {}  story {}/{}\n", kind, story, stories)
            }
            AnnotateProgressEvent::Skipped {
                kind,
                story,
                chunk,
                chunks,
            } => format!(
                "annotate {}  story {}  chunk {}/{}  skipped (already annotated)\n",
                kind, story, chunk, chunks
            ),
            AnnotateProgressEvent::Annotated {
                kind,
                story,
                chunk,
                chunks,
            } => format!(
                "annotate {}  story {}  chunk {}/{}  annotated\n",
                kind, story, chunk, chunks
            ),
            AnnotateProgressEvent::Failed {
                kind,
                story,
                chunk,
                chunks,
                error,
            } => format!(
                "annotate {}  story {}  chunk {}/{}  failed: {}\n",
                kind, story, chunk, chunks, error
            ),
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl ProgressReporter for JsonProgress {
    fn report(&self, event: AnnotateProgressEvent) {
        let obj = match &event {
            AnnotateProgressEvent::Story {
                kind,
                story,
                stories,
            } => serde_json::json!({
                "event": "progress",
                "kind": kind,
                "story": story,
                "stories": stories,
                "status": "story"
            }),
            AnnotateProgressEvent::Skipped {
                kind,
                story,
                chunk,
                chunks,
            } => serde_json::json!({
                "event": "progress",
                "kind": kind,
                "story": story,
                "chunk": chunk,
                "chunks": chunks,
                "status": "skipped"
            }),
            AnnotateProgressEvent::Annotated {
                kind,
                story,
                chunk,
                chunks,
            } => serde_json::json!({
                "event": "progress",
                "kind": kind,
                "story": story,
                "chunk": chunk,
                "chunks": chunks,
                "status": "annotated"
            }),
            AnnotateProgressEvent::Failed {
                kind,
                story,
                chunk,
                chunks,
                error,
            } => serde_json::json!({
                "event": "progress",
                "kind": kind,
                "story": story,
                "chunk": chunk,
                "chunks": chunks,
                "status": "failed",
                "error": error
            }),
        };
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
            let _ = std::io::stderr().lock().flush();
        }
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn report(&self, _event: AnnotateProgressEvent) {}
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    /// Build a reporter for this mode. Caller passes it to the pipeline.
    pub fn reporter(&self) -> Box<dyn ProgressReporter> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
