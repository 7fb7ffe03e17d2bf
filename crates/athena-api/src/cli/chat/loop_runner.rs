//! Main chat loop.

use anyhow::anyhow;
use athena_types::rag::{AskRequest, SourceDocument};
use athena_types::session::Role;
use console::style;

use crate::cli::ask::print_answer;
use crate::cli::output::{print_rag_error, sources_table, spinner};
use crate::state::AppState;

use super::commands::{self, ChatCommand};
use super::input::{ChatInput, InputEvent};

pub async fn run_chat_loop(state: &AppState, room: Option<String>) -> anyhow::Result<()> {
    let progress = spinner("Loading course index...", false);
    state.prepare_index_or_degrade().await;
    progress.finish_and_clear();

    let room_id = room.unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
    let health = state.orchestrator.health().await;
    print_banner(state, &room_id, health.index_loaded);

    let prompt = format!("  {} ", style("You >").green().bold());
    let (mut input, _writer) =
        ChatInput::new(prompt).map_err(|e| anyhow!("failed to initialize input: {e}"))?;
    let mut last_sources: Vec<SourceDocument> = Vec::new();

    loop {
        let text = match input.read_line().await {
            InputEvent::Eof => break,
            InputEvent::Interrupted => {
                println!("\n  {}", style("Press Ctrl+D to exit, or keep chatting.").dim());
                continue;
            }
            InputEvent::Message(text) if text.is_empty() => continue,
            InputEvent::Message(text) => text,
        };

        if let Some(cmd) = commands::parse(&text) {
            match cmd {
                ChatCommand::Help => commands::print_help(),
                ChatCommand::Sources if last_sources.is_empty() => {
                    println!("\n  {}\n", style("The last answer cited no sources.").dim());
                }
                ChatCommand::Sources => println!("\n{}\n", sources_table(&last_sources)),
                ChatCommand::History => print_history(state, &room_id).await,
                ChatCommand::Clear => {
                    state.orchestrator.sessions().remove(&room_id);
                    last_sources.clear();
                    println!("\n  {} Conversation cleared.\n", style("✓").green().bold());
                }
                ChatCommand::Exit => break,
                ChatCommand::Unknown(name) => println!(
                    "\n  {} Unknown command: {}. Type /help for available commands.\n",
                    style("?").yellow().bold(),
                    style(name).dim()
                ),
            }
            continue;
        }

        let progress = spinner("thinking...", false);
        let result = state
            .orchestrator
            .ask(AskRequest::new(text).in_room(room_id.as_str()))
            .await;
        progress.finish_and_clear();

        match result {
            Ok(response) => {
                print_answer(&response, true);
                if response.degraded {
                    println!(
                        "  {} {}\n",
                        style("!").yellow().bold(),
                        style("Answered without full context.").dim()
                    );
                }
                last_sources = response.source_documents;
            }
            Err(err) => print_rag_error(&err, false)?,
        }
    }

    input.flush();
    println!("\n  {}", style("Session ended.").dim());
    state.orchestrator.sessions().close();
    state.orchestrator.engine().shutdown().await;
    Ok(())
}

fn print_banner(state: &AppState, room_id: &str, index_loaded: bool) {
    println!();
    println!("  {}", style("ATHENA").cyan().bold());
    println!("  {}", style("Your academic mentor for the course material.").dim());
    println!();
    println!("  {}  {}", style("Model:").bold(), style(state.orchestrator.engine().model()).dim());
    println!("  {}   {}", style("Room:").bold(), style(room_id).dim());
    if !index_loaded {
        println!(
            "  {}  {}",
            style("Index:").bold(),
            style("not loaded (answers will not cite course material)").yellow()
        );
    }
    println!();
    println!("  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    println!("  {}", style("---").dim());
    println!();
}

async fn print_history(state: &AppState, room_id: &str) {
    let sessions = state.orchestrator.sessions();
    let history = match sessions.get_history(room_id, sessions.max_history_turns()).await {
        Ok(history) => history,
        Err(e) => {
            println!("\n  {} {e}\n", style("!").red().bold());
            return;
        }
    };
    println!();
    if history.is_empty() {
        println!("  {}", style("No conversation yet.").dim());
    }
    for turn in &history {
        let label = match turn.role {
            Role::User => style("You").green().bold(),
            Role::Assistant => style("ATHENA").cyan().bold(),
        };
        println!("  {label} {}", crate::cli::output::preview(&turn.text, 100));
    }
    println!();
}
