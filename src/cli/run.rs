// src/cli/run.rs — Default command: research a question

use std::sync::Arc;

use super::Cli;
use crate::core::orchestrator::ResearchOrchestrator;
use crate::core::types::{ResearchOutcome, RunParams};
use crate::infra::config::Config;
use crate::infra::errors::ResearchError;
use crate::provider::roles::ModelRoles;
use crate::provider::{GenerationService, Message};

/// Resolve run parameters: config defaults, then the effort preset, then
/// explicit flags. Out-of-range values are rejected, not clamped.
pub fn build_params(config: &Config, cli: &Cli) -> Result<RunParams, ResearchError> {
    let mut params = RunParams::from(config);
    if let Some(effort) = cli.effort {
        params = params.with_effort(effort);
    }
    if let Some(n) = cli.queries {
        params.initial_query_count = n;
    }
    if let Some(n) = cli.max_rounds {
        params.max_rounds = n;
    }
    if let Some(n) = cli.results {
        params.result_count = n;
    }
    if cli.model.is_some() {
        params.models = ModelRoles::from_config(&config.models, cli.model.as_deref());
    }
    params.validate()?;
    Ok(params)
}

/// Research `question` and print the answer to stdout.
pub async fn run_research(
    question: &str,
    service: Arc<dyn GenerationService>,
    params: RunParams,
    quiet: bool,
    json: bool,
) -> anyhow::Result<()> {
    if !quiet {
        eprintln!(
            "[research] {} | queries: {} | rounds: {} | model: {}",
            truncate(question, 60),
            params.initial_query_count,
            params.max_rounds,
            params.models.answer,
        );
    }

    let mut orchestrator = ResearchOrchestrator::new(service, params)?;
    if !quiet {
        orchestrator = orchestrator.with_progress(super::progress::terminal_progress());
    }

    let outcome = orchestrator.run(vec![Message::user(question)]).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", render_outcome(&outcome));
    }
    Ok(())
}

/// Answer text followed by the cited sources.
pub fn render_outcome(outcome: &ResearchOutcome) -> String {
    let mut out = outcome.answer.trim_end().to_string();
    if !outcome.sources.is_empty() {
        out.push_str("\n\nSources:");
        for source in &outcome.sources {
            out.push_str(&format!("\n- [{}]({})", source.label, source.url));
        }
    }
    out
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
