// src/main.rs — groundwork entry point

use std::sync::Arc;

use clap::Parser;

use groundwork::cli::{run, Cli, Commands};
use groundwork::infra::config::Config;
use groundwork::infra::errors::ResearchError;
use groundwork::infra::logger;
use groundwork::provider::google::GoogleProvider;
use groundwork::provider::retry::{RetryConfig, RetryService};
use groundwork::provider::GenerationService;

#[tokio::main]
async fn main() {
    // Initialize logging (respects RUST_LOG)
    logger::init_logging("warn");

    if let Err(e) = run_cli().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    if let Some(Commands::Config) = cli.command {
        print!("{}", config.to_toml()?);
        return Ok(());
    }

    // Validate before touching credentials or the network
    let params = run::build_params(&config, &cli)?;
    let question = build_question(&cli)?;

    let service = build_service(&config)?;
    run::run_research(&question, service, params, cli.quiet, cli.json).await
}

/// Gemini client wrapped in retry, keyed from the configured env var.
fn build_service(config: &Config) -> anyhow::Result<Arc<dyn GenerationService>> {
    let api_key = std::env::var(&config.provider.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty())
        .ok_or(ResearchError::NoProvider)?;
    tracing::debug!("Using API key from {}", config.provider.api_key_env);

    let inner: Arc<dyn GenerationService> = Arc::new(GoogleProvider::new(api_key));
    let retry = RetryConfig {
        max_retries: config.provider.max_retries,
        ..RetryConfig::default()
    };
    Ok(Arc::new(RetryService::with_config(inner, retry)))
}

/// Build the question from CLI args and/or stdin.
///
/// 1. `groundwork "question"`: positional args only
/// 2. `groundwork --stdin`: explicit stdin read (entire input is the question)
/// 3. `cat notes.md | groundwork "summarize the open issues"`: piped stdin
///    is appended to the positional args as context
fn build_question(cli: &Cli) -> anyhow::Result<String> {
    use std::io::IsTerminal;

    let has_args = !cli.question.is_empty();
    let stdin_is_pipe = !std::io::stdin().is_terminal();

    if cli.stdin || stdin_is_pipe {
        let content = read_stdin()?;
        if has_args {
            Ok(format!("{}\n\n---\n\n{}", cli.question.join(" "), content))
        } else {
            Ok(content)
        }
    } else if has_args {
        Ok(cli.question.join(" "))
    } else {
        anyhow::bail!("No question provided. Usage: groundwork <question>")
    }
}

fn read_stdin() -> anyhow::Result<String> {
    use std::io::Read;
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    if buf.trim().is_empty() {
        anyhow::bail!("No input received on stdin");
    }
    Ok(buf)
}
