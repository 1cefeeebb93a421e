mod commands;
mod console;
mod settings;

use adscale_core::config::{SyntheticOptions, SIMULATED_DATA_DIR, SIMULATED_DATA_FILE};
use adscale_core::{AnalysisConfig, AnalysisError, RecordSource, SyntheticRecordSource};
use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::report::ReportFormat;
use console::Console;
use settings::Settings;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "adscale")]
#[command(author, version, about = "Marketing campaign performance analytics")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(long, help = "Analyze a generated synthetic dataset")]
    dry_run: bool,

    #[arg(long, value_name = "DIR", help = "Folder containing campaign CSV files")]
    data_dir: Option<PathBuf>,

    #[arg(long, value_name = "DIR", help = "Folder the charts are written to")]
    output_dir: Option<PathBuf>,

    #[arg(long, value_name = "N", help = "Number of top campaigns to report")]
    top: Option<usize>,

    #[arg(long, help = "Output as JSON")]
    json: bool,

    #[arg(long, global = true, value_name = "N", help = "Synthetic campaign count")]
    campaigns: Option<usize>,

    #[arg(long, global = true, value_name = "N", help = "Synthetic day count")]
    days: Option<usize>,

    #[arg(long, global = true, help = "Seed for reproducible synthetic data")]
    seed: Option<u64>,

    #[arg(long, global = true, help = "Disable spinner")]
    no_spinner: bool,

    #[arg(long, global = true, help = "Enable debug logging")]
    debug: bool,

    #[arg(long, global = true, value_name = "FILE", help = "Settings file to use")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Write a synthetic campaign dataset without analyzing it")]
    Generate {
        #[arg(short, long, default_value_os_t = default_generate_output())]
        output: PathBuf,
    },
}

fn default_generate_output() -> PathBuf {
    Path::new(SIMULATED_DATA_DIR).join(SIMULATED_DATA_FILE)
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli) {
        error!("{:#}", err);
        eprintln!("\n  {} {:#}", "Error:".red().bold(), err);
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref());

    if let Some(Commands::Generate { output }) = &cli.command {
        return run_generate(output, synthetic_options(&cli, &settings));
    }

    let config = {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        resolve_config(&cli, &settings, &mut input, &mut io::stderr())?
    };

    let format = if cli.json {
        ReportFormat::Json
    } else {
        ReportFormat::Table
    };
    let console = Console::new(cli.json, !cli.no_spinner && !cli.json);

    commands::analyze::run(&config, &console, format)?;
    Ok(())
}

fn run_generate(output: &Path, options: SyntheticOptions) -> Result<()> {
    options.validate()?;

    let source = SyntheticRecordSource::new(options);
    let set = source
        .load(output)
        .with_context(|| format!("Failed to generate {}", output.display()))?;

    println!(
        "{}",
        format!("  ✓ Wrote {} records to {}", set.len(), output.display()).green()
    );
    Ok(())
}

/// Build the analysis configuration from flags, settings and, for any
/// folder not given on the command line, an interactive prompt.
fn resolve_config<R: BufRead, W: Write>(
    cli: &Cli,
    settings: &Settings,
    input: &mut R,
    prompt: &mut W,
) -> Result<AnalysisConfig> {
    let data_folder = match (&cli.data_dir, cli.dry_run) {
        (Some(dir), _) => dir.clone(),
        (None, true) => PathBuf::from(SIMULATED_DATA_DIR),
        (None, false) => prompt_path("Enter the path to the data folder", input, prompt)?,
    };

    // Fail before asking for the output folder
    if !cli.dry_run && !data_folder.is_dir() {
        return Err(AnalysisError::Config(format!(
            "data folder {} is not a directory",
            data_folder.display()
        ))
        .into());
    }

    let output_folder = match &cli.output_dir {
        Some(dir) => dir.clone(),
        None => prompt_path("Enter the path to the output folder", input, prompt)?,
    };

    let mut config = AnalysisConfig::new(data_folder, output_folder, cli.dry_run);
    config.top_n = cli.top.unwrap_or(settings.top_n);
    config.synthetic = synthetic_options(cli, settings);
    config.chart = settings.chart_options();
    Ok(config)
}

fn synthetic_options(cli: &Cli, settings: &Settings) -> SyntheticOptions {
    let mut options = settings.synthetic_options();
    if let Some(campaigns) = cli.campaigns {
        options.num_campaigns = campaigns;
    }
    if let Some(days) = cli.days {
        options.num_days = days;
    }
    if cli.seed.is_some() {
        options.seed = cli.seed;
    }
    options
}

fn prompt_path<R: BufRead, W: Write>(label: &str, input: &mut R, prompt: &mut W) -> Result<PathBuf> {
    write!(prompt, "{}: ", label)?;
    prompt.flush()?;

    let mut line = String::new();
    let read = input
        .read_line(&mut line)
        .context("Failed to read from stdin")?;
    ensure!(read > 0, "No input provided for: {}", label);

    let trimmed = line.trim();
    ensure!(!trimmed.is_empty(), "An empty path was given for: {}", label);
    Ok(PathBuf::from(trimmed))
}
