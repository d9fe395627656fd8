mod cli;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::{ExitStatus, OutputFormat};
use criba::config::CONFIG_FILENAME;
use criba::{CategoryPassPolicy, GoldenRanking, Grade, SbflFormula};

#[derive(Parser)]
#[command(name = "criba")]
#[command(version, about = "Corpus quality and fault localization for transpilation corpora", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file
    #[arg(long, global = true, default_value = CONFIG_FILENAME)]
    config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign a risk tier to every record and write labeled JSON Lines
    Label {
        /// Corpus file (.json, .jsonl or .ndjson)
        corpus: PathBuf,

        /// Labeled corpus output
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Grade the corpus globally and per category
    Report {
        /// Corpus file
        corpus: PathBuf,

        /// Write the JSON report here
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format for stdout
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Fail when the global grade is worse than this (A-F)
        #[arg(long)]
        min_grade: Option<Grade>,
    },

    /// Compare a baseline with a current run and fail on regressions
    Diff {
        /// Baseline report (or corpus with --by-record)
        baseline: PathBuf,

        /// Current report (or corpus with --by-record)
        current: PathBuf,

        /// Compare individual records of two corpora
        #[arg(long)]
        by_record: bool,

        /// When a category counts as passing (category comparison only)
        #[arg(long, value_enum, conflicts_with = "by_record")]
        policy: Option<CategoryPassPolicy>,
    },

    /// Promote a report to be the new baseline
    Baseline {
        /// Report to promote
        report: PathBuf,

        /// Baseline location
        #[arg(long)]
        baseline: Option<PathBuf>,
    },

    /// Draw a stratified sample for human review
    Sample {
        /// Corpus file
        corpus: PathBuf,

        /// Fraction of each category to draw, in (0, 1]
        #[arg(long)]
        fraction: Option<f64>,

        /// RNG seed
        #[arg(long)]
        seed: Option<u64>,

        /// Sample output (default: <reviews_dir>/<YYYY>-Q<n>-sample.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize completed reviews
    HitlSummary {
        /// Directory of review files
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Print the reviewer guide
    HitlGuide,

    /// Curate golden traces per error code
    Golden {
        /// Corpus file
        corpus: PathBuf,

        /// Target codes with optional quotas, e.g. E0308=10,E0433
        #[arg(long)]
        codes: Option<String>,

        /// Quota for codes without an explicit one
        #[arg(long)]
        per_code: Option<usize>,

        /// Ranking criterion
        #[arg(long, value_enum)]
        ranking: Option<GoldenRanking>,

        /// Golden traces output
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Rank features by suspiciousness
    Localize {
        /// Corpus file
        corpus: PathBuf,

        /// Suspiciousness formula
        #[arg(long, value_enum)]
        formula: Option<SbflFormula>,

        /// Output format for stdout
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Find zero-success categories and the features blocking them
    Insights {
        /// Corpus file
        corpus: PathBuf,

        /// Write the JSON insights here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn run(cli: Cli) -> anyhow::Result<ExitStatus> {
    let config = cli::load_config(&cli.config)?;

    match cli.command {
        Commands::Label { corpus, output } => {
            info!("Labeling {:?}", corpus);
            cli::analyze::cmd_label(&config, &corpus, &output)
        }
        Commands::Report {
            corpus,
            output,
            format,
            min_grade,
        } => {
            info!("Generating quality report for {:?}", corpus);
            cli::quality::cmd_report(&config, &corpus, output.as_deref(), format, min_grade)
        }
        Commands::Diff {
            baseline,
            current,
            by_record,
            policy,
        } => {
            info!("Comparing {:?} against {:?}", current, baseline);
            cli::quality::cmd_diff(&config, &baseline, &current, by_record, policy)
        }
        Commands::Baseline { report, baseline } => {
            info!("Promoting {:?} to baseline", report);
            cli::quality::cmd_baseline(&config, &report, baseline)
        }
        Commands::Sample {
            corpus,
            fraction,
            seed,
            output,
        } => {
            info!("Sampling {:?}", corpus);
            cli::review::cmd_sample(&config, &corpus, fraction, seed, output)
        }
        Commands::HitlSummary { dir } => cli::review::cmd_hitl_summary(&config, dir),
        Commands::HitlGuide => cli::review::cmd_hitl_guide(),
        Commands::Golden {
            corpus,
            codes,
            per_code,
            ranking,
            output,
        } => {
            info!("Curating golden traces from {:?}", corpus);
            cli::review::cmd_golden(
                &config,
                &corpus,
                codes.as_deref(),
                per_code,
                ranking,
                &output,
            )
        }
        Commands::Localize {
            corpus,
            formula,
            format,
        } => {
            info!("Localizing faults in {:?}", corpus);
            cli::analyze::cmd_localize(&config, &corpus, formula, format)
        }
        Commands::Insights { corpus, output } => {
            info!("Analyzing {:?}", corpus);
            cli::analyze::cmd_insights(&config, &corpus, output.as_deref())
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter_layer = if cli.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else if cli.verbose {
        tracing_subscriber::EnvFilter::new("info")
    } else {
        tracing_subscriber::EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("criba v{}", env!("CARGO_PKG_VERSION"));

    let status = match run(cli) {
        Ok(status) => status,
        Err(e) => {
            eprintln!("{} {:#}", "error:".bright_red().bold(), e);
            ExitStatus::Error
        }
    };
    std::process::exit(status.code());
}
