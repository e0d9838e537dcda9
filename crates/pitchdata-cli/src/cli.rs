use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "pitchdata",
    version,
    about = "NWSL statistics ingestion and agent tool server"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Pretty-print the JSON envelope.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Override the warehouse database path.
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the enumerated work units for an ingestion run.
    Plan(PlanArgs),
    /// Run the rate-governed ingestion pipeline.
    Ingest(IngestArgs),
    /// List the registered tools and their parameter schemas.
    Tools,
    /// Dispatch one tool call.
    Call(CallArgs),
    /// Run a guarded SQL query against the warehouse.
    Sql(SqlArgs),
    /// Summarize ingestion checkpoints.
    Report,
}

/// Which leagues, seasons, and teams an ingestion run covers.
#[derive(Debug, Args)]
pub struct ScopeArgs {
    /// Season to ingest (repeatable); defaults to the configured list.
    #[arg(long = "season", value_name = "YYYY")]
    pub seasons: Vec<String>,

    /// League id; defaults to the configured league.
    #[arg(long, value_name = "ID")]
    pub league: Option<String>,

    /// Team id for per-team endpoints (repeatable).
    #[arg(long = "team", value_name = "ID")]
    pub teams: Vec<String>,
}

#[derive(Debug, Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Minimum seconds between upstream requests.
    #[arg(long, value_name = "SECS")]
    pub min_interval_secs: Option<u64>,

    /// Upstream API key; generated via the key endpoint when omitted.
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,
}

#[derive(Debug, Args)]
pub struct CallArgs {
    /// Tool name.
    pub tool: String,

    /// Tool parameter as NAME=VALUE (repeatable); values parse as JSON first,
    /// falling back to plain strings.
    #[arg(long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SqlArgs {
    /// SQL text; read-only unless --write is given.
    pub query: String,

    #[arg(long, default_value_t = 10_000)]
    pub max_rows: usize,

    #[arg(long, default_value_t = 5_000)]
    pub query_timeout_ms: u64,

    /// Allow write statements.
    #[arg(long)]
    pub write: bool,
}
