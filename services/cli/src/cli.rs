use crate::commands::{run_compare, run_organization, run_subject};
use clap::{Args, Parser, Subcommand};
use multirater::analytics::{AnalyticsEngine, EngineConfig};
use multirater::config::AppConfig;
use multirater::error::AppError;
use multirater::telemetry;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "multirater",
    about = "Aggregate multi-rater feedback into privacy-gated reports",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Per-question, competency and section report for one subject
    Subject(SubjectArgs),
    /// Completion rates, averages and rankings across every response in scope
    Organization(OrganizationArgs),
    /// Side-by-side distribution of selected questions
    Compare(CompareArgs),
}

#[derive(Args, Debug)]
pub(crate) struct InputArgs {
    /// Assessment definition (JSON)
    #[arg(long)]
    pub(crate) definition: PathBuf,
    /// Response export (CSV)
    #[arg(long)]
    pub(crate) responses: PathBuf,
    /// Organization the responses belong to
    #[arg(long, default_value = "default")]
    pub(crate) organization: String,
    /// Override ANALYTICS_MIN_REVIEWERS for this run
    #[arg(long)]
    pub(crate) min_reviewers: Option<usize>,
}

#[derive(Args, Debug)]
pub(crate) struct SubjectArgs {
    #[command(flatten)]
    pub(crate) input: InputArgs,
    /// Assignment export (CSV); required with --subject
    #[arg(long)]
    pub(crate) assignments: Option<PathBuf>,
    /// Restrict the report to this subject's assignments
    #[arg(long, requires = "assignments")]
    pub(crate) subject: Option<String>,
    /// Emit flat question x relationship rows as CSV instead of JSON
    #[arg(long)]
    pub(crate) csv: bool,
}

#[derive(Args, Debug)]
pub(crate) struct OrganizationArgs {
    #[command(flatten)]
    pub(crate) input: InputArgs,
    /// Assignment export (CSV)
    #[arg(long)]
    pub(crate) assignments: Option<PathBuf>,
    /// Emit flat question x relationship rows as CSV instead of JSON
    #[arg(long)]
    pub(crate) csv: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CompareArgs {
    #[command(flatten)]
    pub(crate) input: InputArgs,
    /// Question to include; repeat for more
    #[arg(long = "question", required = true)]
    pub(crate) questions: Vec<String>,
}

pub(crate) fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry)?;

    match cli.command {
        Command::Subject(args) => {
            let engine = engine(config.engine, &args.input)?;
            run_subject(engine, args)
        }
        Command::Organization(args) => {
            let engine = engine(config.engine, &args.input)?;
            run_organization(engine, args)
        }
        Command::Compare(args) => {
            let engine = engine(config.engine, &args.input)?;
            run_compare(engine, args)
        }
    }
}

fn engine(mut config: EngineConfig, input: &InputArgs) -> Result<AnalyticsEngine, AppError> {
    if let Some(min_reviewers) = input.min_reviewers {
        config.min_reviewers = min_reviewers;
    }
    Ok(AnalyticsEngine::new(config)?)
}
