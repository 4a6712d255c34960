//! Annotator implementations.
//!
//! An [`Annotator`] turns one chunk (plus its parent story for context)
//! into a typed annotation value, or fails. Three implementations cover the
//! annotation kinds in the store:
//!
//! - [`EmbeddingAnnotator`] — fixed-length embedding vector per chunk.
//! - [`TimingAnnotator`] — one phase label out of a fixed set.
//! - [`TacticAnnotator`] — integer severity 0–3 for one tactic.
//!
//! Replies are validated strictly: a label outside the phase set or a
//! severity outside 0..=3 is an annotator failure and nothing is stored.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::gemini::GeminiClient;
use crate::tactics::TacticDef;

/// The fixed phase-label set for `timing` annotations.
pub const PHASES: [&str; 4] = ["beginning", "middle", "leaving", "after"];

const SEVERITY_RANGE: std::ops::RangeInclusive<i64> = 0..=3;

const TACTIC_SYSTEM_INSTRUCTION: &str = "You are an expert in relationships, \
psychology, and manipulation techniques, preparing educational material that \
helps people recognize these techniques in their own lives.";

/// One chunk in its store position, handed to an annotator.
pub struct ChunkContext<'a> {
    /// 1-based story position, used in progress output and payload titles.
    pub story: usize,
    /// 1-based chunk position within the story.
    pub chunk: usize,
    pub chunk_text: &'a str,
    pub story_text: &'a str,
}

/// A capability that classifies or embeds a chunk's text.
#[async_trait]
pub trait Annotator: Send + Sync {
    async fn annotate(&self, ctx: &ChunkContext<'_>) -> Result<Value>;
}

// ============ Embedding ============

pub struct EmbeddingAnnotator {
    client: Arc<GeminiClient>,
    model: String,
    dims: usize,
}

impl EmbeddingAnnotator {
    pub fn new(client: Arc<GeminiClient>, model: impl Into<String>, dims: usize) -> Self {
        Self {
            client,
            model: model.into(),
            dims,
        }
    }
}

#[async_trait]
impl Annotator for EmbeddingAnnotator {
    async fn annotate(&self, ctx: &ChunkContext<'_>) -> Result<Value> {
        let title = format!("Story {} Chunk {}", ctx.story, ctx.chunk);
        let vector = self
            .client
            .embed_content(&self.model, ctx.chunk_text, &title)
            .await?;
        embedding_value(vector, self.dims)
    }
}

/// Validate vector length and convert to a JSON array.
fn embedding_value(vector: Vec<f32>, dims: usize) -> Result<Value> {
    if dims > 0 && vector.len() != dims {
        bail!(
            "Embedding has {} values, expected {}",
            vector.len(),
            dims
        );
    }
    Ok(serde_json::to_value(vector)?)
}

// ============ Timing ============

pub struct TimingAnnotator {
    client: Arc<GeminiClient>,
    model: String,
}

impl TimingAnnotator {
    pub fn new(client: Arc<GeminiClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Annotator for TimingAnnotator {
    async fn annotate(&self, ctx: &ChunkContext<'_>) -> Result<Value> {
        let prompt = timing_prompt(ctx.chunk_text, ctx.story_text);
        let reply = self
            .client
            .generate_content(&self.model, None, &prompt)
            .await?;
        Ok(Value::String(normalize_phase(&reply)?))
    }
}

fn timing_prompt(chunk: &str, story: &str) -> String {
    format!(
        "Given the following section of a story about an abusive relationship, \
decide at which phase of the relationship the section takes place. The possible \
phases are:\n\
- \"beginning\": the early stages of the relationship\n\
- \"middle\": during the ongoing abusive relationship\n\
- \"leaving\": while the victim is deciding to leave or in the process of leaving\n\
- \"after\": after the relationship has ended and healing has begun\n\n\
Use the full story as context, but label only the specific section.\n\n\
Full story for context:\n{story}\n\n\
Section to label:\n{chunk}\n\n\
Reply with ONLY ONE WORD: \"beginning\", \"middle\", \"leaving\", or \"after\"."
    )
}

/// Case-fold and trim a phase reply, requiring membership in [`PHASES`].
fn normalize_phase(raw: &str) -> Result<String> {
    let label = raw.trim().to_lowercase();
    if !PHASES.contains(&label.as_str()) {
        bail!("Reply {:?} is not one of the known phases", label);
    }
    Ok(label)
}

// ============ Tactic severity ============

pub struct TacticAnnotator {
    client: Arc<GeminiClient>,
    model: String,
    tactic: &'static TacticDef,
}

impl TacticAnnotator {
    pub fn new(
        client: Arc<GeminiClient>,
        model: impl Into<String>,
        tactic: &'static TacticDef,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            tactic,
        }
    }
}

#[async_trait]
impl Annotator for TacticAnnotator {
    async fn annotate(&self, ctx: &ChunkContext<'_>) -> Result<Value> {
        let prompt = severity_prompt(self.tactic, ctx.chunk_text);
        let reply = self
            .client
            .generate_content(&self.model, Some(TACTIC_SYSTEM_INSTRUCTION), &prompt)
            .await?;
        Ok(Value::from(parse_severity(&reply)?))
    }
}

fn severity_prompt(tactic: &TacticDef, chunk: &str) -> String {
    let examples = tactic
        .examples
        .iter()
        .map(|example| format!("- {example}"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Analyze this excerpt from a story of an abusive relationship for signs \
of {name}.\n\n\
Define {name} using these examples:\n{examples}\n\n\
Rate from 0 to 3 how strongly this manipulation tactic appears (0 = not \
present, 1 = slightly present, 2 = moderately present, 3 = strongly present). \
This is for educational purposes. Assume most excerpts will not show this \
tactic, since each is only part of a larger story. Only answer 2 or 3 when \
the text holds strong evidence that would help a reader recognize the tactic \
in the future.\n\n\
Excerpt to analyze:\n{chunk}\n\n\
Respond with ONLY a single number: 0, 1, 2, or 3.",
        name = tactic.name,
    )
}

/// Parse a severity reply, requiring an integer in 0..=3.
fn parse_severity(raw: &str) -> Result<i64> {
    let severity: i64 = raw
        .trim()
        .parse()
        .with_context(|| format!("Reply {:?} is not a number", raw.trim()))?;

    if !SEVERITY_RANGE.contains(&severity) {
        bail!("Severity {} is outside 0..=3", severity);
    }
    Ok(severity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phase_case_folds_and_trims() {
        assert_eq!(normalize_phase(" Leaving \n").unwrap(), "leaving");
        assert_eq!(normalize_phase("BEGINNING").unwrap(), "beginning");
    }

    #[test]
    fn test_normalize_phase_rejects_unknown_label() {
        assert!(normalize_phase("ending").is_err());
        assert!(normalize_phase("").is_err());
        assert!(normalize_phase("the middle").is_err());
    }

    #[test]
    fn test_parse_severity_accepts_bounds() {
        assert_eq!(parse_severity("0").unwrap(), 0);
        assert_eq!(parse_severity(" 3\n").unwrap(), 3);
    }

    #[test]
    fn test_parse_severity_rejects_out_of_range() {
        assert!(parse_severity("4").is_err());
        assert!(parse_severity("-1").is_err());
    }

    #[test]
    fn test_parse_severity_rejects_non_numeric() {
        assert!(parse_severity("maybe").is_err());
        assert!(parse_severity("2.5").is_err());
    }

    #[test]
    fn test_embedding_value_checks_length() {
        assert!(embedding_value(vec![0.0; 768], 768).is_ok());
        assert!(embedding_value(vec![0.0; 767], 768).is_err());
        assert!(embedding_value(vec![], 768).is_err());
    }

    #[test]
    fn test_severity_prompt_includes_examples() {
        let tactic = crate::tactics::find("gaslighting").unwrap();
        let prompt = severity_prompt(tactic, "He said it never happened.");
        assert!(prompt.contains("gaslighting"));
        assert!(prompt.contains(tactic.examples[0]));
        assert!(prompt.contains("He said it never happened."));
    }

    #[test]
    fn test_timing_prompt_includes_story_context() {
        let prompt = timing_prompt("the section", "the whole story");
        assert!(prompt.contains("the section"));
        assert!(prompt.contains("the whole story"));
        for phase in PHASES {
            assert!(prompt.contains(phase));
        }
    }
}
