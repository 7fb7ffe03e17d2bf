//! `athena search`: retrieval without generation.

use anyhow::Result;
use console::style;

use crate::state::AppState;

use super::output::{Reported, print_json, print_rag_error, results_table};

pub async fn search(
    state: &AppState,
    query: &str,
    k: Option<usize>,
    min_score: Option<f32>,
    json: bool,
) -> Result<()> {
    state.prepare_index(None, false).await?;

    let k = k.unwrap_or(state.config.retrieval.k);
    let min_score = min_score.or(state.config.retrieval.min_score);
    let results = match state.orchestrator.search(query, k, min_score).await {
        Ok(results) => results,
        Err(err) => {
            print_rag_error(&err, json)?;
            return Err(Reported.into());
        }
    };

    if json {
        return print_json(&results);
    }

    println!();
    if results.is_empty() {
        let threshold = min_score.map_or_else(|| "none".to_string(), |m| m.to_string());
        println!(
            "  {} No passages matched (k = {k}, min score = {threshold}).",
            style("i").blue().bold()
        );
    } else {
        println!("{}", results_table(&results));
    }
    println!();
    Ok(())
}
