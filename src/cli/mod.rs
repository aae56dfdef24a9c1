// src/cli/mod.rs — CLI definition (clap derive)

pub mod progress;
pub mod run;

use clap::{Parser, Subcommand};

use crate::core::types::Effort;

#[derive(Parser)]
#[command(
    name = "groundwork",
    about = "Iterative web research with cited answers",
    version
)]
pub struct Cli {
    /// Question to research (default command when no subcommand given)
    #[arg(trailing_var_arg = true)]
    pub question: Vec<String>,

    /// Research depth preset (initial queries, max rounds)
    #[arg(short, long, value_enum)]
    pub effort: Option<Effort>,

    /// Number of initial search queries (overrides --effort)
    #[arg(long)]
    pub queries: Option<u32>,

    /// Max research rounds (overrides --effort)
    #[arg(long)]
    pub max_rounds: Option<u32>,

    /// Sources to consult per query
    #[arg(long)]
    pub results: Option<u32>,

    /// Reasoning model used for reflection and the final answer
    #[arg(short, long)]
    pub model: Option<String>,

    /// Config file path
    #[arg(long)]
    pub config: Option<String>,

    /// Read the question from stdin
    #[arg(long)]
    pub stdin: bool,

    /// Suppress progress output (only emit final result)
    #[arg(long)]
    pub quiet: bool,

    /// Print the result as one JSON object
    #[arg(long)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the effective configuration as TOML
    Config,
}
