use clap::Args;
use serde_json::Value;

use immo_finance_core::capital_gains::calculate_all_capital_gain_regimes;

use crate::input;

/// Arguments for the resale computation
#[derive(Args)]
pub struct CapitalGainsArgs {
    /// Path to JSON investment with project start and end dates
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_capital_gains(
    args: CapitalGainsArgs,
    policy: Option<&str>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let investment = input::read_investment(args.input.as_deref(), policy)?;
    let result = calculate_all_capital_gain_regimes(&investment)?;
    Ok(serde_json::to_value(result)?)
}
