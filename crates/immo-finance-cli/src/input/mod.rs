pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;
use std::path::Path;

use immo_finance_core::investment::Investment;
use immo_finance_core::policy::TaxPolicy;

/// Deserialise the command input from `--input` or piped stdin.
pub fn read_input<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        file::read_json(path)
    } else if let Some(data) = stdin::read_stdin()? {
        Ok(serde_json::from_value(data)?)
    } else {
        Err(format!("--input <file.json> or stdin required for {what}").into())
    }
}

/// Read an investment, replacing its embedded policy when `--policy` is given.
pub fn read_investment(
    path: Option<&str>,
    policy: Option<&str>,
) -> Result<Investment, Box<dyn std::error::Error>> {
    let mut investment: Investment = read_input(path, "an investment")?;
    if let Some(policy_path) = policy {
        investment.policy = TaxPolicy::load(Path::new(policy_path))?;
        tracing::debug!(path = policy_path, "tax policy override loaded");
    }
    Ok(investment)
}
