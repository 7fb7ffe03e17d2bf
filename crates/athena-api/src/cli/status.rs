//! `athena status`: index, embedder, and model dashboard.

use anyhow::Result;
use athena_core::index::IndexRepository;
use athena_types::rag::HealthStatus;
use console::style;

use crate::state::AppState;

use super::output::{print_json, spinner};

pub async fn status(state: &AppState, load_model: bool, json: bool) -> Result<()> {
    let index = state.repository.load().await;
    let engine = state.orchestrator.engine();

    let mut model_error = None;
    if load_model {
        let progress = spinner("Loading model...", json);
        if let Err(e) = engine.init().await {
            model_error = Some(e.to_string());
        }
        progress.finish_and_clear();
    }

    let health = HealthStatus {
        index_loaded: matches!(index, Ok(Some(_))),
        model_loaded: engine.is_ready(),
    };
    let (chunks, identity, generation, index_error) = match &index {
        Ok(Some(index)) => (
            Some(index.len()),
            Some(index.identity().clone()),
            Some(index.generation()),
            None,
        ),
        Ok(None) => (None, None, None, None),
        Err(e) => (None, None, None, Some(e.to_string())),
    };

    if json {
        return print_json(&serde_json::json!({
            "version": env!("CARGO_PKG_VERSION"),
            "data_dir": state.paths.data_dir.display().to_string(),
            "health": health,
            "index": {
                "dir": state.repository.dir().display().to_string(),
                "chunks": chunks,
                "embedder": identity,
                "generation": generation,
                "error": index_error,
            },
            "embedding_provider": state.config.embedding.provider,
            "engine": {
                "backend": engine.backend_name(),
                "model": engine.model(),
                "base_url": state.config.engine.base_url,
                "device_preference": state.config.engine.device,
                "device": engine.device(),
                "error": model_error,
            },
        }));
    }

    let check = |ok: bool| {
        if ok {
            format!("{}", style("✓").green())
        } else {
            format!("{}", style("✗").red())
        }
    };

    println!();
    println!("  {} ATHENA v{}", style("⚡").bold(), env!("CARGO_PKG_VERSION"));
    println!();

    println!("  {}", style("── Index ──").dim());
    println!("  {} Loaded", check(health.index_loaded));
    match (&chunks, &identity, &index_error) {
        (Some(chunks), Some(identity), _) => {
            println!("  Chunks:     {}", style(chunks).bold());
            println!("  Embedder:   {}", style(identity).cyan());
            if let Some(generation) = generation {
                println!("  Generation: {}", style(generation).dim());
            }
        }
        (_, _, Some(error)) => println!("  {}", style(error).red()),
        _ => println!(
            "  {}",
            style("No index yet. Build one with: athena ingest").yellow()
        ),
    }
    println!("  Dir:        {}", style(state.repository.dir().display()).dim());
    println!();

    println!("  {}", style("── Model ──").dim());
    println!("  {} Loaded", check(health.model_loaded));
    println!(
        "  Backend:    {} at {}",
        engine.backend_name(),
        style(&state.config.engine.base_url).dim()
    );
    println!("  Model:      {}", style(engine.model()).cyan());
    match engine.device() {
        Some(device) => println!("  Device:     {}", style(device).bold()),
        None => println!(
            "  Device:     {} {}",
            style(state.config.engine.device).dim(),
            style("(preference; not loaded)").dim()
        ),
    }
    if let Some(error) = model_error {
        println!("  {}", style(error).red());
    }
    println!();

    println!("  {}", style("── System ──").dim());
    println!("  Data dir:   {}", style(state.paths.data_dir.display()).dim());
    println!();
    Ok(())
}
