//! Birdwatch CLI - clean and explore bird-observation exports
//!
//! # Main Commands
//!
//! ```bash
//! birdwatch clean grassland.xlsx forest.xlsx -o cleaned.csv   # Merge + clean
//! birdwatch serve                                             # HTTP API (port 3000)
//! ```
//!
//! # Inspection Commands
//!
//! ```bash
//! birdwatch readiness cleaned.csv        # Which feature columns survived
//! birdwatch validate cleaned.csv         # Check records against the schema
//! birdwatch lens temporal --start 2018-05-01 --species BCCH
//! birdwatch rules --extended             # Show imputation rules
//! ```

use birdwatch::{
    apply_filters, load_cleaned, run, summarize, validate_records, AppConfig, CleanOptions,
    DateRange, FilterCriteria, Lens, OutputFormat, RuleSet,
};
use birdwatch::transform::temporal::parse_date;
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "birdwatch")]
#[command(about = "Merge, clean and explore bird-observation spreadsheet exports", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge and clean raw exports into one dataset
    Clean {
        /// Raw exports (xlsx, xls, ods, csv)
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Output file (default: BIRDWATCH_DATA or merged_data_cleaned.csv)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (default: from the output extension)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Also impute field-condition, id-method and sex columns
        #[arg(long)]
        extended: bool,

        /// Skip schema validation of the cleaned records
        #[arg(long)]
        no_validate: bool,

        /// Write the run report (JSON) to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show which feature columns a cleaned dataset carries
    Readiness {
        /// Cleaned dataset (default: BIRDWATCH_DATA)
        input: Option<PathBuf>,
    },

    /// Validate a cleaned dataset against the record schema
    Validate {
        /// Cleaned dataset (default: BIRDWATCH_DATA)
        input: Option<PathBuf>,
    },

    /// Print one lens summary as JSON
    Lens {
        #[arg(value_enum)]
        lens: Lens,

        /// Cleaned dataset (default: BIRDWATCH_DATA)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// First date to include
        #[arg(long)]
        start: Option<String>,

        /// Last date to include
        #[arg(long)]
        end: Option<String>,

        /// Species codes, comma-separated
        #[arg(long, value_delimiter = ',')]
        species: Vec<String>,

        /// Observers, comma-separated
        #[arg(long, value_delimiter = ',')]
        observer: Vec<String>,
    },

    /// Show the imputation rules
    Rules {
        #[arg(long)]
        extended: bool,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: BIRDWATCH_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// Dataset to serve (default: BIRDWATCH_DATA)
        #[arg(short, long)]
        data: Option<PathBuf>,
    },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = match AppConfig::from_env() {
        Ok(config) => dispatch(cli.command, config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("birdwatch=info")))
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();
}

async fn dispatch(command: Commands, config: AppConfig) -> CliResult {
    match command {
        Commands::Clean {
            inputs,
            output,
            format,
            extended,
            no_validate,
            report,
        } => {
            let output = output.unwrap_or_else(|| config.data_path.clone());
            let options = CleanOptions {
                extended: extended || config.extended,
                format: format.unwrap_or_else(|| OutputFormat::from_path(&output)),
                validate: !no_validate,
            };
            cmd_clean(&inputs, &output, &options, report.as_deref())
        }

        Commands::Readiness { input } => cmd_readiness(&input.unwrap_or(config.data_path)),

        Commands::Validate { input } => cmd_validate(&input.unwrap_or(config.data_path)),

        Commands::Lens {
            lens,
            data,
            start,
            end,
            species,
            observer,
        } => {
            let criteria = build_criteria(start.as_deref(), end.as_deref(), species, observer)?;
            cmd_lens(&data.unwrap_or(config.data_path), lens, &criteria)
        }

        Commands::Rules { extended } => {
            let rules = RuleSet::for_options(extended || config.extended);
            println!("Imputation rules ({}):", rules.len());
            print!("{}", rules.describe());
            Ok(())
        }

        Commands::Serve { port, data } => {
            let config = AppConfig {
                port: port.unwrap_or(config.port),
                data_path: data.unwrap_or(config.data_path),
                ..config
            };
            birdwatch::server::start_server(config).await?;
            Ok(())
        }
    }
}

fn cmd_clean(inputs: &[PathBuf], output: &Path, options: &CleanOptions, report_path: Option<&Path>) -> CliResult {
    let report = run(inputs, output, options)?;

    eprintln!();
    eprint!("{}", report.readiness);

    if let Some(path) = report_path {
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        eprintln!("💾 Report written to: {}", path.display());
    }
    Ok(())
}

fn cmd_readiness(input: &Path) -> CliResult {
    let table = load_cleaned(input)?;
    print!("{}", birdwatch::summarize_readiness(&table));
    Ok(())
}

fn cmd_validate(input: &Path) -> CliResult {
    eprintln!("✔️  Validating: {}", input.display());

    let table = load_cleaned(input)?;
    let stats = validate_records(&table.to_json_records())?;

    for err in stats.errors.iter().take(5) {
        eprintln!("\n❌ Record {} invalid:", err.row);
        for msg in err.errors.iter().take(3) {
            eprintln!("   - {}", msg);
        }
    }

    eprintln!("\n📊 Results: {} valid, {} invalid", stats.valid, stats.invalid);

    if stats.invalid > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn cmd_lens(input: &Path, lens: Lens, criteria: &FilterCriteria) -> CliResult {
    let table = load_cleaned(input)?;
    let filtered = apply_filters(&table, criteria);
    println!("{}", serde_json::to_string_pretty(&summarize(&filtered, lens))?);
    Ok(())
}

fn build_criteria(
    start: Option<&str>,
    end: Option<&str>,
    species: Vec<String>,
    observer: Vec<String>,
) -> Result<FilterCriteria, Box<dyn std::error::Error>> {
    let parse = |name: &str, raw: Option<&str>| match raw {
        None => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| format!("Invalid --{} date: '{}'", name, s)),
    };
    let start = parse("start", start)?;
    let end = parse("end", end)?;

    let mut criteria = FilterCriteria::new()
        .with_species(species)
        .with_observer(observer);
    if start.is_some() || end.is_some() {
        criteria = criteria.with_date_range(DateRange::new(start, end));
    }
    Ok(criteria)
}
