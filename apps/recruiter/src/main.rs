mod actions;
mod config;
mod enrichment;
mod errors;
mod export;
mod intake;
mod llm_client;
mod models;
mod pipeline;
mod scheduling;
mod scoring;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::actions::ActionsClient;
use crate::config::Config;
use crate::enrichment::{LinkedInProfileSource, LlmProfileGenerator, ProfileEnricher, ProfileGenerator};
use crate::export::ActionSheetsExporter;
use crate::intake::{ActionMailFetcher, ResumeParser};
use crate::llm_client::LlmClient;
use crate::pipeline::{Orchestrator, PipelineReport, PipelineSettings, PipelineState, RunConfig};
use crate::scheduling::CalendarScheduler;
use crate::scoring::{CandidateScorer, HeuristicScorer, LlmCandidateScorer, ScoringCriteria};

#[derive(Parser, Debug)]
#[command(name = "recruiter", version, about = "Resume-to-interview recruiting pipeline")]
struct Cli {
    /// Pull new resumes from the mailbox; `false` uses files already in the inbox directory
    #[arg(long, value_name = "BOOL", default_value_t = true, action = clap::ArgAction::Set)]
    check_mail: bool,

    /// Maximum number of messages/resumes to process
    #[arg(long, value_name = "N", default_value_t = 10)]
    max_items: usize,

    /// Minimum score (0-10, inclusive) for a candidate to be shortlisted
    #[arg(long, value_name = "SCORE", default_value_t = 5.0)]
    min_score: f64,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting recruiter v{}", env!("CARGO_PKG_VERSION"));

    let orchestrator = build_orchestrator(&config)?;

    let run_config = RunConfig {
        check_mail: cli.check_mail,
        max_items: cli.max_items,
        min_score_threshold: cli.min_score,
    };

    match orchestrator.run(PipelineState::new(run_config)).await {
        Ok(state) => {
            let report = PipelineReport::from_state(&state);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{report}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("run aborted: {e}");
            eprintln!("run aborted: {e}");
            if let Some(state) = e.last_state() {
                eprintln!("{}", serde_json::to_string_pretty(state)?);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Wires the production collaborators. Without an LLM key, parsing and
/// scoring fall back to heuristics and no profile fields are generated.
fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    let actions = ActionsClient::new(config.composio_base_url.clone(), config.composio_api_key.clone())
        .context("failed to create actions client")?;

    let llm = match &config.anthropic_api_key {
        Some(key) => {
            let llm = LlmClient::new(
                config.anthropic_base_url.clone(),
                key.clone(),
                config.anthropic_model.clone(),
            )
            .context("failed to create LLM client")?;
            info!(model = llm.model(), "LLM client initialized");
            Some(llm)
        }
        None => {
            info!("ANTHROPIC_API_KEY not set, using heuristic parsing and scoring");
            None
        }
    };

    let criteria = match &config.criteria_path {
        Some(path) => ScoringCriteria::load(path)
            .with_context(|| format!("failed to load scoring criteria from {}", path.display()))?,
        None => ScoringCriteria::default(),
    };
    info!(role = %criteria.role, "scoring criteria loaded");

    let scorer: Arc<dyn CandidateScorer> = match llm.clone() {
        Some(llm) => Arc::new(LlmCandidateScorer::new(llm)),
        None => Arc::new(HeuristicScorer),
    };
    let generator = llm
        .clone()
        .map(|llm| Arc::new(LlmProfileGenerator::new(llm)) as Arc<dyn ProfileGenerator>);
    let enricher = ProfileEnricher::new(
        Arc::new(LinkedInProfileSource::new(actions.clone(), config)),
        generator,
    );

    let orchestrator = Orchestrator::builder(PipelineSettings::from_config(config, criteria))
        .with_mail_fetcher(Arc::new(ActionMailFetcher::new(actions.clone(), config)))
        .with_parser(Arc::new(ResumeParser::new(llm)))
        .with_enricher(Arc::new(enricher))
        .with_scorer(scorer)
        .with_scheduler(Arc::new(CalendarScheduler::new(actions.clone(), config)))
        .with_spreadsheet_exporter(Arc::new(ActionSheetsExporter::new(actions, config)))
        .build()?;
    Ok(orchestrator)
}
