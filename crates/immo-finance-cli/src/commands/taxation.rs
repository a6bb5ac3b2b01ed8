use clap::Args;
use serde_json::Value;

use immo_finance_core::taxation::calculate_all_tax_regimes;

use crate::input;

/// Arguments for annual taxation
#[derive(Args)]
pub struct TaxRegimesArgs {
    /// Path to JSON investment
    #[arg(long)]
    pub input: Option<String>,

    /// Calendar year to report; earlier project years are replayed first
    #[arg(long)]
    pub year: i32,
}

pub fn run_tax_regimes(
    args: TaxRegimesArgs,
    policy: Option<&str>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let investment = input::read_investment(args.input.as_deref(), policy)?;
    let result = calculate_all_tax_regimes(&investment, args.year)?;
    Ok(serde_json::to_value(result)?)
}
