use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lendsim::config::{ExecutionMode, SimulationConfig};
use lendsim::report::{self, Summary};
use lendsim::simulation::Simulation;
use lendsim::source;

/// Monte Carlo odds of a lending fund going negative
#[derive(Parser)]
#[command(name = "lendsim", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a borrower portfolio and write summary + frequency tables
    Run(RunArgs),
    /// Print the shape of a borrower CSV without simulating
    Inspect(InspectArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Borrower CSV: name, principal, limit, lgd, pd, risk_rate (header row skipped)
    #[arg(long)]
    input: PathBuf,
    /// JSON config file; omitted fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    trials: Option<u64>,
    /// Horizon in months
    #[arg(long)]
    months: Option<u32>,
    #[arg(long)]
    seed: Option<u64>,
    /// Starting fund values, comma separated
    #[arg(long, value_delimiter = ',')]
    fund_values: Option<Vec<f64>>,
    /// Single generator, no thread pool
    #[arg(long)]
    sequential: bool,
    /// Directory for the summary and CSV tables
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,
    /// Also export every trial's min/final value for the fund value at this index
    #[arg(long, value_name = "INDEX")]
    trial_outcomes: Option<usize>,
    /// Print the summary as JSON on stdout
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct InspectArgs {
    /// Borrower CSV
    #[arg(long)]
    input: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => run(args),
        Commands::Inspect(args) => inspect(args),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run(args: RunArgs) -> lendsim::Result<()> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_json_file(path)?,
        None => SimulationConfig::canonical(),
    };
    if let Some(trials) = args.trials {
        config.trials = trials;
    }
    if let Some(months) = args.months {
        config.months = months;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(fund_values) = args.fund_values {
        config.fund_values = fund_values;
    }
    if args.sequential {
        config.mode = ExecutionMode::Sequential;
    }

    // Nothing is written until every record and the config have validated.
    let borrowers = source::load_borrowers(&args.input, &config.terms)?;
    let mut sim = Simulation::new(config, borrowers)?;
    if let Some(index) = args.trial_outcomes {
        sim = sim.with_trial_outcomes(index)?;
    }

    let result = sim.run();
    report::write_all(&args.output_dir, &result)?;

    let summary = Summary::of(&result);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.render());
    }
    Ok(())
}

fn inspect(args: InspectArgs) -> lendsim::Result<()> {
    let records = source::read_records_from_path(&args.input)?;
    let summary = source::inspect(&records);
    println!("{} records (including header row)", summary.records);
    println!("{} fields", summary.fields);
    println!("{:?}", summary.header);
    if let Some(first) = &summary.first_record {
        println!("{first:?}");
    }
    Ok(())
}
