use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rust_field_clean::{CancelToken, CorrectionConfig, CorrectionRequest, Corrector};

#[derive(Parser)]
#[command(name = "rust-field-clean")]
#[command(about = "Normalize names, cities, countries and free-text cells")]
struct Args {
    /// JSON config file (default: sources in the platform data directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Correct a single value
    Correct {
        value: String,
        /// Column name used as the domain hint
        #[arg(short = 'C', long)]
        column: Option<String>,
    },
    /// Correct one value per stdin line; change log JSON goes to stderr
    Column { name: String },
    /// Remember a human correction
    Learn { original: String, canonical: String },
    /// Protect a term from correction
    Whitelist { term: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => CorrectionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => CorrectionConfig::in_default_data_dir(),
    };
    let corrector = Corrector::from_config(config)?;

    match args.command {
        Command::Correct { value, column } => {
            let mut request = CorrectionRequest::new(value);
            request.column_hint = column;
            let result = corrector.correct(&request);
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Column { name } => {
            let values = io::stdin()
                .lock()
                .lines()
                .collect::<io::Result<Vec<String>>>()
                .context("reading values from stdin")?;
            let outcome = corrector.correct_column(&name, &values, &CancelToken::new());
            let mut stdout = io::stdout().lock();
            for value in &outcome.values {
                writeln!(stdout, "{}", value)?;
            }
            eprintln!("{}", corrector.change_log().to_json()?);
            info!(
                "{} of {} rows corrected ({} distinct values)",
                outcome.changed,
                outcome.values.len(),
                outcome.distinct
            );
        }
        Command::Learn { original, canonical } => {
            corrector
                .learn(&original, &canonical)
                .with_context(|| format!("saving mapping '{}' -> '{}'", original, canonical))?;
            println!("Learned: {} -> {}", original, canonical);
        }
        Command::Whitelist { term } => {
            if corrector.protect(&term)? {
                println!("Protected: {}", term);
            } else {
                println!("Already protected: {}", term);
            }
        }
    }
    Ok(())
}
