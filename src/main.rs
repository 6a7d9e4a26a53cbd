use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use querywatch::analyzer::{advise, normalize};
use querywatch::config::AnalyzerConfig;
use querywatch::replay::replay_file;
use querywatch::QueryTracker;
use tracing_subscriber::EnvFilter;

/// Development-time SQL query analyzer
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the normalized pattern key for a statement
    Normalize {
        /// SQL statement
        sql: String,
    },
    /// Suggest an index for a statement's WHERE clause
    Suggest {
        /// SQL statement
        sql: String,
    },
    /// Analyze a JSON Lines query log
    Replay {
        /// Path to the log (one {"request_id", "sql", "duration_ms"} per line)
        file: PathBuf,

        /// Slow-query threshold in milliseconds
        #[arg(long = "slow-ms")]
        slow_ms: Option<u64>,

        /// Repeat count that flags an N+1 pattern
        #[arg(long = "n-plus-one")]
        n_plus_one: Option<usize>,

        /// Config file (defaults to the user config directory)
        #[arg(long = "config")]
        config: Option<PathBuf>,

        #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    // Diagnostics go to stderr so reports on stdout stay clean
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Normalize { sql } => println!("{}", normalize(&sql)),
        Command::Suggest { sql } => match advise(&sql) {
            Some(suggestion) => {
                println!("{}", suggestion.to_sql());
                println!("-- table: {}", suggestion.table);
                println!("-- columns: {}", suggestion.columns.join(", "));
            }
            None => {
                eprintln!("No index suggestion: query has no FROM table or usable WHERE columns");
                std::process::exit(1);
            }
        },
        Command::Replay {
            file,
            slow_ms,
            n_plus_one,
            config,
            format,
        } => {
            let mut analyzer_config = match config {
                Some(path) => AnalyzerConfig::load_from(&path)?,
                None => AnalyzerConfig::load()?,
            };
            if let Some(ms) = slow_ms {
                analyzer_config.slow_query_threshold_ms = ms;
            }
            if let Some(count) = n_plus_one {
                analyzer_config.n_plus_one_threshold = count;
            }
            // Replaying a log only makes sense with the analyzer on
            let analyzer_config = analyzer_config.with_enabled(true);
            analyzer_config.validate()?;

            let tracker = QueryTracker::new(&analyzer_config);
            let reports = replay_file(&file, &tracker)?;

            match format {
                OutputFormat::Text => {
                    for report in &reports {
                        print!("{}", report);
                    }
                }
                OutputFormat::Json => {
                    let json = serde_json::to_string_pretty(&reports)
                        .context("failed to serialize reports")?;
                    println!("{}", json);
                }
            }
        }
    }

    Ok(())
}
