//! Store statistics and annotation-coverage overview.
//!
//! A quick summary of what the store holds: story and chunk counts plus
//! per-kind annotation coverage. Used by `anno stats` to give confidence
//! that chunking and annotation runs are converging on full coverage.

use anyhow::Result;

use crate::config::Config;
use crate::pipeline::AnnotationSlot;
use crate::store::{self, StoryStore};
use crate::tactics;

/// Run the stats command: load the store and print a summary.
pub fn run_stats(config: &Config) -> Result<()> {
    let data = store::load(&config.store.path)?;

    let total_stories = data.stories.len();
    let total_chunks = data.chunk_count();
    let unchunked = data.stories.iter().filter(|s| s.chunks.is_empty()).count();

    println!("Story Annotator — Store Stats");
    println!("=============================");
    println!();
    println!("  Store:     {}", config.store.path.display());
    println!("  Stories:   {}", total_stories);
    println!("  Chunks:    {}", total_chunks);
    if unchunked > 0 {
        println!("  Unchunked stories: {}", unchunked);
    }
    println!();

    print_coverage(&data, &AnnotationSlot::field("embedding"), total_chunks);
    print_coverage(&data, &AnnotationSlot::field("timing"), total_chunks);
    for tactic in tactics::TACTICS {
        print_coverage(
            &data,
            &AnnotationSlot::keyed("manipulation_tactics", tactic.name),
            total_chunks,
        );
    }

    Ok(())
}

fn print_coverage(data: &StoryStore, slot: &AnnotationSlot, total_chunks: usize) {
    let annotated = data
        .stories
        .iter()
        .flat_map(|s| s.chunks.iter())
        .filter(|c| slot.is_set(c))
        .count();

    let percent = if total_chunks > 0 {
        (annotated * 100) / total_chunks
    } else {
        0
    };

    println!(
        "  {:<40} {} / {} ({}%)",
        slot.label(),
        annotated,
        total_chunks,
        percent
    );
}
