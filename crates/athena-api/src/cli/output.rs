//! Shared terminal output helpers.

use std::time::Duration;

use athena_types::corpus::RetrievalResult;
use athena_types::error::RagError;
use athena_types::rag::SourceDocument;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

/// A spinner on stderr, hidden in quiet or JSON mode.
pub fn spinner(message: &str, hidden: bool) -> ProgressBar {
    if hidden {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("  {spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// The failure was already printed; the caller only needs a non-zero exit.
#[derive(Debug, thiserror::Error)]
#[error("request failed")]
pub struct Reported;

/// Whether `err` still has to be printed before exiting.
pub fn needs_report(err: &anyhow::Error) -> bool {
    !err.is::<Reported>()
}

/// Print a structured error: `{"error": {...}}` in JSON mode, styled otherwise.
pub fn print_rag_error(err: &RagError, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&serde_json::json!({ "error": err }));
    }
    let hint = if err.retryable { " (retry shortly)" } else { "" };
    eprintln!();
    eprintln!(
        "  {} {}{}",
        style("✗").red().bold(),
        err.message,
        style(hint).dim()
    );
    eprintln!();
    Ok(())
}

pub fn sources_table(sources: &[SourceDocument]) -> Table {
    let mut table = base_table(vec!["#", "Source", "Score"]);
    for (i, source) in sources.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(&source.source_name).fg(Color::Cyan),
            score_cell(source.score),
        ]);
    }
    table
}

pub fn results_table(results: &[RetrievalResult]) -> Table {
    let mut table = base_table(vec!["#", "Source", "Score", "Passage"]);
    for (i, result) in results.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(&result.source_name).fg(Color::Cyan),
            score_cell(result.score),
            Cell::new(preview(&result.text, 120)),
        ]);
    }
    table
}

fn base_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header.into_iter().map(|h| Cell::new(h).fg(Color::White)));
    table
}

fn score_cell(score: f32) -> Cell {
    let color = if score >= 0.5 {
        Color::Green
    } else if score >= 0.2 {
        Color::Yellow
    } else {
        Color::DarkGrey
    };
    Cell::new(format!("{score:.3}")).fg(color)
}

/// First `max_chars` characters of `text` on one line.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}
