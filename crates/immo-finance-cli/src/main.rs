mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::capital_gains::CapitalGainsArgs;
use commands::financing::{AmortizationArgs, InferRateArgs, PaymentArgs};
use commands::metrics::MetricsArgs;
use commands::taxation::TaxRegimesArgs;

/// Leveraged rental-property simulations
#[derive(Parser)]
#[command(
    name = "immo",
    version,
    about = "Leveraged rental-property simulations",
    long_about = "A CLI for simulating a leveraged rental-property purchase with decimal \
                  precision: loan amortization with deferral, annual taxation under the \
                  micro-foncier, réel-foncier, micro-BIC and réel-BIC regimes, resale \
                  capital gains and whole-project returns."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// TOML file overriding the tax policy constants
    #[arg(long, global = true)]
    policy: Option<String>,

    /// Increase log verbosity (-v info, -vv debug); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the monthly amortization schedule of a loan
    Amortization(AmortizationArgs),
    /// Calculate the regular monthly instalment of a loan
    Payment(PaymentArgs),
    /// Infer the interest rate behind a schedule or a payment
    InferRate(InferRateArgs),
    /// Tax outcome of the four regimes for one year
    TaxRegimes(TaxRegimesArgs),
    /// Capital-gain tax and net proceeds at the project end date
    CapitalGains(CapitalGainsArgs),
    /// Whole-project cash flows, yields and returns
    Metrics(MetricsArgs),
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

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let policy = cli.policy.as_deref();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Amortization(args) => commands::financing::run_amortization(args),
        Commands::Payment(args) => commands::financing::run_payment(args),
        Commands::InferRate(args) => commands::financing::run_infer_rate(args),
        Commands::TaxRegimes(args) => commands::taxation::run_tax_regimes(args, policy),
        Commands::CapitalGains(args) => commands::capital_gains::run_capital_gains(args, policy),
        Commands::Metrics(args) => commands::metrics::run_metrics(args, policy),
        Commands::Version => {
            println!("immo {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(mut value) => {
            immo_finance_core::round_presentation(&mut value);
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
