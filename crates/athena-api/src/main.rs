//! Athena CLI entry point.
//!
//! Binary name: `athena`
//!
//! Parses CLI arguments, sets up tracing, wires the application state, then
//! dispatches to the command handler.

mod cli;
mod state;

use std::process::ExitCode;

use athena_types::rag::AskRequest;
use clap::Parser;
use clap_complete::generate;

use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = athena_observe::init_tracing(
        athena_observe::verbosity_directive(cli.quiet, cli.verbose),
        cli.otel,
    ) {
        eprintln!("Error: failed to initialize tracing: {e}");
        return ExitCode::FAILURE;
    }

    let result = run(cli).await;
    athena_observe::shutdown_tracing();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Command handlers print request failures themselves
            if cli::output::needs_report(&e) {
                eprintln!("Error: {e:?}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "athena", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(cli.data_dir.as_deref()).await?;

    match cli.command {
        Commands::Ingest { corpus, rebuild } => {
            cli::ingest::ingest(&state, corpus, rebuild, cli.json, cli.quiet).await?;
        }

        Commands::Ask {
            question,
            room,
            k,
            max_new_tokens,
            temperature,
        } => {
            let mut request = AskRequest::new(question);
            request.room_id = room;
            request.k = k;
            request.max_new_tokens = max_new_tokens;
            request.temperature = temperature;
            cli::ask::ask(&state, request, cli.json, cli.quiet).await?;
        }

        Commands::Search { query, k, min_score } => {
            cli::search::search(&state, &query, k, min_score, cli.json).await?;
        }

        Commands::Chat { room } => {
            cli::chat::loop_runner::run_chat_loop(&state, room).await?;
        }

        Commands::Status { load } => {
            cli::status::status(&state, load, cli.json).await?;
        }

        Commands::Completions { .. } => unreachable!("handled before state init"),
    }

    Ok(())
}
