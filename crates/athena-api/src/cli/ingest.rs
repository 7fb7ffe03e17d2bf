//! `athena ingest`: build or reuse the embedding index.

use std::path::PathBuf;

use anyhow::Result;
use console::style;

use crate::state::AppState;

use super::output::{print_json, spinner};

pub async fn ingest(
    state: &AppState,
    corpus: Option<PathBuf>,
    rebuild: bool,
    json: bool,
    quiet: bool,
) -> Result<()> {
    let progress = spinner("Embedding corpus...", json || quiet);
    let outcome = state.prepare_index(corpus.clone(), rebuild).await;
    progress.finish_and_clear();
    let outcome = outcome?;

    let index = &outcome.index;
    let corpus_dir = corpus.unwrap_or_else(|| state.paths.corpus_dir.clone());

    if json {
        let sources: std::collections::BTreeSet<&str> =
            index.chunks().iter().map(|c| c.source_name.as_str()).collect();
        return print_json(&serde_json::json!({
            "built": outcome.built,
            "chunks": index.len(),
            "sources": sources.len(),
            "dimension": index.dimension(),
            "embedder": index.identity(),
            "generation": index.generation(),
            "corpus_dir": corpus_dir.display().to_string(),
            "index_dir": state.repository.dir().display().to_string(),
        }));
    }
    if quiet {
        return Ok(());
    }

    let verb = if outcome.built { "Built" } else { "Reused" };
    println!();
    println!(
        "  {} {} index with {} chunks",
        style("✓").green().bold(),
        verb,
        style(index.len()).bold()
    );
    println!("  Embedder:   {}", style(index.identity()).cyan());
    println!("  Generation: {}", style(index.generation()).dim());
    println!("  Corpus:     {}", style(corpus_dir.display()).dim());
    println!("  Index:      {}", style(state.repository.dir().display()).dim());
    if !outcome.built {
        println!();
        println!(
            "  {}",
            style("Run with --rebuild to re-embed the corpus.").dim()
        );
    }
    println!();
    Ok(())
}
