use clap::Args;
use serde_json::Value;

use immo_finance_core::metrics::calculate_financial_metrics;

use crate::input;

/// Arguments for whole-project metrics
#[derive(Args)]
pub struct MetricsArgs {
    /// Path to JSON investment with project start and end dates
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_metrics(
    args: MetricsArgs,
    policy: Option<&str>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let investment = input::read_investment(args.input.as_deref(), policy)?;
    let result = calculate_financial_metrics(&investment)?;
    Ok(serde_json::to_value(result)?)
}
