use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clauseguard::jobs::{JobRegistry, submit_upload};
use clauseguard::rag::shared_embedder;
use clauseguard::types::JobOutcome;
use clauseguard::{Config, ConfigLoader, ContractAnalyzer, VectorStore};

#[derive(Parser)]
#[command(name = "clauseguard")]
#[command(
    version,
    about = "Contract risk analysis: clause detection, adversarial scoring, safe redrafting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long)]
    verbose: bool,

    #[arg(long, short)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a contract PDF and print the risk report
    Analyze {
        /// Path to the contract PDF
        pdf: PathBuf,
        #[arg(long, short, help = "Write the JSON report here instead of stdout")]
        output: Option<PathBuf>,
    },

    /// Manage the reference corpus
    Corpus {
        #[command(subcommand)]
        action: CorpusAction,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum CorpusAction {
    /// Show exemplar counts by category and risk level
    Stats,
    /// Add a verified clause to the golden standards (offline admin path)
    Add {
        #[arg(long, help = "Target category, e.g. 'Unilateral Termination'")]
        category: String,
        #[arg(long, value_parser = ["safe", "risky"])]
        risk_level: String,
        /// Clause text
        text: String,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(long, help = "Output JSON instead of TOML")]
        json: bool,
    },
    /// Show configuration file paths
    Path,
    /// Initialize project configuration
    Init {
        #[arg(long, short, help = "Overwrite existing config")]
        force: bool,
    },
}

fn main() -> ExitCode {
    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e}", style("Error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Analyze { pdf, output } => {
            let config = ConfigLoader::load()?;
            let rt = Runtime::new()?;
            rt.block_on(run_analyze(&config, &pdf, output.as_deref()))?;
        }
        Commands::Corpus { action } => run_corpus(action)?,
        Commands::Config { action } => match action {
            ConfigAction::Show { json } => ConfigLoader::show_config(json)?,
            ConfigAction::Path => ConfigLoader::show_path(),
            ConfigAction::Init { force } => {
                let dir = ConfigLoader::init_project(force)?;
                println!("Initialized project config in {}", dir.display());
            }
        },
    }

    Ok(())
}

/// Submit the PDF as a background job and follow it to a terminal state
async fn run_analyze(
    config: &Config,
    pdf: &std::path::Path,
    output: Option<&std::path::Path>,
) -> anyhow::Result<()> {
    if pdf.extension().is_none_or(|ext| ext != "pdf") {
        anyhow::bail!("only PDF files are supported: {}", pdf.display());
    }

    let filename = pdf
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| pdf.display().to_string());

    let analyzer = Arc::new(ContractAnalyzer::from_config(config)?);
    let registry = Arc::new(JobRegistry::new());

    let analysis_id = submit_upload(
        registry.clone(),
        analyzer.clone(),
        &config.jobs.upload_dir,
        pdf,
        filename.clone(),
    )?;
    eprintln!(
        "{} {filename} ({analysis_id})",
        style("Analyzing").cyan().bold()
    );

    let result = loop {
        match registry.result(analysis_id) {
            Some(JobOutcome::Completed(result)) => break *result,
            Some(JobOutcome::Failed(error)) => anyhow::bail!("analysis failed: {error}"),
            Some(JobOutcome::Pending) | None => {
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        }
    };

    let stats = analyzer.stats();
    eprintln!(
        "{} {} risky clauses, {} compound risks, {} model calls",
        style("Done:").green().bold(),
        result.document.risky_clauses_found,
        result.summary.compound_risks_found,
        stats.total_calls
    );

    let report = serde_json::to_string_pretty(&result)?;
    match output {
        Some(path) => {
            std::fs::write(path, report)?;
            eprintln!("Report written to {}", path.display());
        }
        None => println!("{report}"),
    }

    Ok(())
}

fn run_corpus(action: CorpusAction) -> anyhow::Result<()> {
    let config = ConfigLoader::load()?;
    let store = VectorStore::open(&config.corpus.db_path, shared_embedder())?;

    match action {
        CorpusAction::Stats => {
            let stats = store.stats()?;
            println!("Golden standards: {} clauses", stats.total_clauses);
            println!();
            println!("By category:");
            for (category, count) in &stats.by_category {
                println!("  {category:<28} {count}");
            }
            println!();
            println!("By risk level:");
            for (risk_level, count) in &stats.by_risk_level {
                println!("  {risk_level:<28} {count}");
            }
        }
        CorpusAction::Add {
            category,
            risk_level,
            text,
        } => {
            if !config.corpus.target_categories.contains(&category) {
                anyhow::bail!(
                    "unknown category '{category}'; expected one of: {}",
                    config.corpus.target_categories.join(", ")
                );
            }
            let id = store.add_verified_clause(&text, &category, &risk_level)?;
            println!(
                "{} {id} ({category}, {risk_level})",
                style("Added").green().bold()
            );
        }
    }

    Ok(())
}
