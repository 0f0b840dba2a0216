use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "aisov",
    version,
    about = "AI share of voice: how often, how high and how warmly LLMs mention your brand"
)]
pub struct Cli {
    /// Path to the YAML configuration
    #[arg(long, global = true, env = "AISOV_CONFIG", default_value = "aisov.yaml")]
    pub config: PathBuf,

    /// SQLite database file
    #[arg(long, global = true, env = "AISOV_DB", default_value = "aisov.db")]
    pub db: PathBuf,

    /// Log filter (overrides AISOV_LOG and the config's log_level)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Reject unknown configuration keys
    #[arg(long, global = true)]
    pub strict: bool,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a sample config and prompt catalogue
    Init(InitArgs),
    /// Load a prompt catalogue into the database
    Seed(SeedArgs),
    /// Query providers, store answers and classify them
    Run(RunArgs),
    /// Classify stored answers that have no metric yet
    Classify(ClassifyArgs),
    /// Compute and store AISOV scores for a period
    Score(ScoreArgs),
    /// Cluster active prompts by embedding
    Cluster(ClusterArgs),
    /// Print the visibility report
    Report(ReportArgs),
    /// List recent runs
    Runs(RunsArgs),
    /// Inspect or toggle prompts
    Prompts(PromptsArgs),
    Version,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Console,
    Json,
}

#[derive(clap::Args, Debug, Clone)]
pub struct InitArgs {
    /// Directory to write aisov.yaml and prompts.json into
    #[arg(long, default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite existing files
    #[arg(long)]
    pub force: bool,
}

pub const DEFAULT_CATALOGUE: &str = "prompts.json";

#[derive(clap::Args, Debug, Clone)]
pub struct SeedArgs {
    #[arg(long, default_value = DEFAULT_CATALOGUE)]
    pub catalogue: PathBuf,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunArgs {
    /// Catalogue to upsert before querying (default: prompts.json, when present)
    #[arg(long)]
    pub catalogue: Option<PathBuf>,

    /// Providers to query (default: every provider with an API key)
    #[arg(long, value_delimiter = ',')]
    pub providers: Vec<String>,

    /// Process only the first N active prompts
    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ClassifyArgs {
    /// Classify at most N pending answers
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ScoreArgs {
    /// First day (YYYY-MM-DD), default today
    #[arg(long)]
    pub start: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD), default today
    #[arg(long)]
    pub end: Option<NaiveDate>,

    /// Brand to score (default: the configured primary brand)
    #[arg(long)]
    pub brand: Option<String>,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ClusterArgs {
    /// Recompute embeddings instead of using the cache
    #[arg(long)]
    pub refresh_embeddings: bool,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Clone)]
pub struct ReportArgs {
    #[arg(long)]
    pub start: Option<NaiveDate>,

    #[arg(long)]
    pub end: Option<NaiveDate>,

    #[arg(long)]
    pub brand: Option<String>,

    /// Number of trend points
    #[arg(long, default_value_t = aisov_core::report::DEFAULT_TREND_POINTS)]
    pub trend: usize,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Write the report here instead of stdout
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct RunsArgs {
    #[arg(long, default_value_t = 10)]
    pub limit: usize,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PromptsArgs {
    #[command(subcommand)]
    pub cmd: PromptsSub,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PromptsSub {
    /// List every prompt (+ active, - inactive)
    List,
    /// Include a prompt in future runs
    Activate { id: i64 },
    /// Exclude a prompt from future runs and clustering
    Deactivate { id: i64 },
}
