//! The `anno chunk` command: split every story's text into chunks.
//!
//! Chunking defines the granularity the annotation stage operates on and is
//! meant to run once, before any annotation. Re-splitting a story replaces
//! its chunks array wholesale — including every annotation on it — so
//! stories that already have chunks are skipped unless `--force`.

use anyhow::Result;

use crate::chunk::split_text;
use crate::config::Config;
use crate::store::{self, Chunk};

pub fn run_chunk(config: &Config, force: bool, dry_run: bool) -> Result<()> {
    let mut data = store::load(&config.store.path)?;

    if dry_run {
        let mut would_chunk = 0usize;
        let mut would_skip = 0usize;
        let mut chunk_total = 0usize;

        for story in &data.stories {
            if !story.chunks.is_empty() && !force {
                would_skip += 1;
                continue;
            }
            would_chunk += 1;
            chunk_total += split_text(&story.content, &config.chunking).len();
        }

        println!("chunk (dry-run)");
        println!("  stories: {}", data.stories.len());
        println!("  stories to chunk: {}", would_chunk);
        println!("  stories skipped (already chunked): {}", would_skip);
        println!("  estimated chunks: {}", chunk_total);
        return Ok(());
    }

    let mut chunked = 0usize;
    let mut skipped = 0usize;
    let mut chunks_written = 0usize;

    for story in &mut data.stories {
        if !story.chunks.is_empty() && !force {
            skipped += 1;
            continue;
        }

        story.chunks = split_text(&story.content, &config.chunking)
            .into_iter()
            .map(Chunk::new)
            .collect();

        chunked += 1;
        chunks_written += story.chunks.len();
    }

    // Chunking is a local transform; one rewrite at the end is enough.
    store::save(&config.store.path, &data)?;

    println!("chunk");
    println!("  stories: {}", data.stories.len());
    println!("  stories chunked: {}", chunked);
    println!("  stories skipped (already chunked): {}", skipped);
    println!("  chunks written: {}", chunks_written);
    println!("ok");

    Ok(())
}
