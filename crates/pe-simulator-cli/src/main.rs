mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::compare::CompareArgs;
use commands::fees::FeesArgs;
use commands::irr::IrrArgs;
use commands::sensitivity::SensitivityArgs;
use commands::simulate::SimulateArgs;

/// Private equity and private debt investment simulator
#[derive(Parser)]
#[command(
    name = "pesim",
    version,
    about = "Private equity and private debt investment simulator",
    long_about = "Projects a fund subscription year by year with decimal precision: \
                  capital calls, distributions, same-year recycling, platform fees, \
                  compounded final value, MOIC, IRR and taxes. Also compares \
                  strategies and runs sensitivity tables."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Project one investment year by year
    Simulate(SimulateArgs),
    /// Platform fee schedule of a subscription
    Fees(FeesArgs),
    /// Solve the IRR of an annual cash-flow series
    Irr(IrrArgs),
    /// Run the same subscription under every strategy
    Compare(CompareArgs),
    /// 1- or 2-way sensitivity table over simulation parameters
    Sensitivity(SensitivityArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Simulate(args) => commands::simulate::run_simulate(args),
        Commands::Fees(args) => commands::fees::run_fees(args),
        Commands::Irr(args) => commands::irr::run_irr(args),
        Commands::Compare(args) => commands::compare::run_compare(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Version => {
            println!("pesim {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
