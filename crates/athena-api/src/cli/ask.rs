//! `athena ask`: one orchestrated question.

use anyhow::Result;
use athena_types::rag::{AskRequest, AskResponse};
use console::style;
use tokio_util::sync::CancellationToken;

use crate::state::AppState;

use super::output::{Reported, print_json, print_rag_error, sources_table, spinner};

pub async fn ask(state: &AppState, request: AskRequest, json: bool, quiet: bool) -> Result<()> {
    state.prepare_index_or_degrade().await;

    let cancel = CancellationToken::new();
    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let progress = spinner("thinking...", json || quiet);
    let result = state.orchestrator.ask_with_cancel(request, cancel).await;
    progress.finish_and_clear();
    ctrl_c.abort();

    match result {
        Ok(response) if json => print_json(&response),
        Ok(response) => {
            print_answer(&response, quiet);
            Ok(())
        }
        Err(err) => {
            print_rag_error(&err, json)?;
            Err(Reported.into())
        }
    }
}

/// Answer text, then a sources table and any degradation notes.
pub fn print_answer(response: &AskResponse, quiet: bool) {
    println!();
    for line in response.answer_text.lines() {
        println!("  {line}");
    }
    println!();
    if quiet {
        return;
    }

    if !response.source_documents.is_empty() {
        println!("{}", sources_table(&response.source_documents));
    }
    if response.degraded {
        println!(
            "  {} {}",
            style("!").yellow().bold(),
            style("Answered without full context (index or session store unavailable).").dim()
        );
    }
    if response.truncated {
        println!(
            "  {} {}",
            style("!").yellow().bold(),
            style("Some history or passages were left out to fit the prompt budget.").dim()
        );
    }
    if response.degraded || response.truncated || !response.source_documents.is_empty() {
        println!();
    }
}
