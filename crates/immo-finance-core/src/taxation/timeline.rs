use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ImmoFinanceError;
use crate::financing::amortization::AmortizationSchedule;
use crate::investment::Investment;
use crate::taxation::depreciation::DepreciationYear;
use crate::taxation::regimes::{compute_year, TaxCarryState, TaxResult, YearTaxation};
use crate::types::{with_metadata, ComputationOutput, RegimeBreakdown};
use crate::ImmoFinanceResult;

/// Tax position of every regime for one requested year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnualTaxReport {
    pub year: i32,
    pub regimes: RegimeBreakdown<TaxResult>,
    pub depreciation: DepreciationYear,
    /// Balances carried into the following year
    pub carry_state: TaxCarryState,
}

/// Replay every year from `first_year` through `last_year` in order.
///
/// Carried balances of year Y depend on the whole prefix, so this is the
/// only way to obtain a valid state for a later year.
pub fn tax_timeline(
    investment: &Investment,
    schedule: &AmortizationSchedule,
    first_year: i32,
    last_year: i32,
) -> ImmoFinanceResult<Vec<YearTaxation>> {
    if last_year < first_year {
        return Err(ImmoFinanceError::configuration(
            "year",
            format!("Year {last_year} precedes the first project year {first_year}"),
        ));
    }

    let mut state = TaxCarryState::initial(&investment.tax);
    let mut years = Vec::with_capacity((last_year - first_year + 1) as usize);
    for year in first_year..=last_year {
        let taxation = compute_year(
            year,
            investment.expenses_for(year),
            &schedule.year_totals(year),
            &state,
            &investment.tax,
            &investment.policy,
        )?;
        state = taxation.next_state.clone();
        years.push(taxation);
    }
    Ok(years)
}

/// Tax outcome of the four regimes for `year`, replaying all earlier years.
pub fn calculate_all_tax_regimes(
    investment: &Investment,
    year: i32,
) -> ImmoFinanceResult<ComputationOutput<AnnualTaxReport>> {
    let start = Instant::now();
    investment.validate()?;

    let schedule = investment.active_schedule()?;
    let timeline = tax_timeline(investment, &schedule, investment.first_year(), year)?;

    let warnings: Vec<String> = timeline
        .iter()
        .flat_map(|t| t.warnings.iter().cloned())
        .collect();

    let last = timeline
        .into_iter()
        .last()
        .ok_or_else(|| ImmoFinanceError::InsufficientData("empty tax timeline".into()))?;

    let report = AnnualTaxReport {
        year,
        regimes: last.regimes,
        depreciation: last.depreciation,
        carry_state: last.next_state,
    };

    Ok(with_metadata(
        "Annual rental taxation: micro-foncier, réel-foncier, micro-BIC, réel-BIC",
        &serde_json::json!({ "investment": investment.name, "year": year }),
        warnings,
        start.elapsed().as_micros() as u64,
        report,
    ))
}
