//! The story document store.
//!
//! A single UTF-8 JSON file holding `{ "stories": [...] }`. Each story has
//! its full original `content` and, after chunking, a `chunks` array. Each
//! chunk carries its `content` plus an open-ended annotation mapping that is
//! flattened into the chunk object on disk, so annotated chunks look like
//! `{ "content": ..., "embedding": [...], "timing": "leaving" }`.
//!
//! Every save is a full-document rewrite through a sibling temp file and an
//! atomic rename, so the file on disk is always complete, loadable JSON.
//! Fields this tool does not understand are preserved across a load/save
//! cycle.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Top level of the store file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryStore {
    #[serde(default)]
    pub stories: Vec<Story>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// One story: full original text plus its ordered chunks.
///
/// Stories have no explicit identifier; their positional index is the id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chunks: Vec<Chunk>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A bounded-length span of a story's text, the unit of annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content: String,
    /// Annotation kind → value (`embedding`, `timing`,
    /// `manipulation_tactics`, ...). Flattened into the chunk object.
    #[serde(flatten)]
    pub annotations: BTreeMap<String, Value>,
}

impl Chunk {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            annotations: BTreeMap::new(),
        }
    }
}

impl StoryStore {
    pub fn chunk_count(&self) -> usize {
        self.stories.iter().map(|s| s.chunks.len()).sum()
    }
}

/// Load the store. A missing or unparseable file is a fatal startup error.
pub fn load(path: &Path) -> Result<StoryStore> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read story store: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Story store is not valid JSON: {}", path.display()))
}

/// Rewrite the whole store. Writes a sibling temp file and renames it over
/// the target so a crash mid-write never leaves a truncated store behind.
pub fn save(path: &Path, store: &StoryStore) -> Result<()> {
    let json = serde_json::to_string_pretty(store)?;

    let tmp = PathBuf::from(format!("{}.tmp", path.display()));
    std::fs::write(&tmp, json)
        .with_context(|| format!("Failed to write story store: {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to replace story store: {}", path.display()))?;

    Ok(())
}

/// Persistence seam for the annotation pipeline. The pipeline persists the
/// whole store after every processed chunk; tests substitute a counting
/// implementation to assert exactly when saves happen.
pub trait StorePersister {
    fn persist(&mut self, store: &StoryStore) -> Result<()>;
}

/// Persists to the configured store file via [`save`].
pub struct FilePersister {
    path: PathBuf,
}

impl FilePersister {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StorePersister for FilePersister {
    fn persist(&mut self, store: &StoryStore) -> Result<()> {
        save(&self.path, store)
    }
}
