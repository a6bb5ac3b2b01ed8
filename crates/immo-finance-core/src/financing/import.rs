use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::financing::amortization::{AmortizationRow, AmortizationSchedule};
use crate::financing::payment::{solve_monthly_rate, RateInference};
use crate::types::{with_metadata, ComputationOutput};
use crate::ImmoFinanceResult;

/// A repayment plan taken from a lender document instead of being generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedSchedule {
    pub rows: Vec<AmortizationRow>,
}

/// The imported plan, untouched, plus the rate reconstructed from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportedScheduleAnalysis {
    pub schedule: AmortizationSchedule,
    pub rate: RateInference,
}

/// Reconstruct the nominal rate behind an imported schedule.
///
/// The first non-deferred row supplies the principal and the regular
/// instalment; the number of non-deferred rows is the annuity length.
pub fn infer_rate_from_schedule(rows: &[AmortizationRow]) -> RateInference {
    let repayment: Vec<&AmortizationRow> = rows.iter().filter(|r| !r.is_deferred).collect();
    let Some(first) = repayment.first() else {
        return solve_monthly_rate(Decimal::ZERO, Decimal::ZERO, 0);
    };
    solve_monthly_rate(
        first.balance_outstanding,
        first.payment,
        repayment.len() as u32,
    )
}

/// Accept an imported schedule verbatim and report its implied rate.
pub fn analyse_imported_schedule(
    input: &ImportedSchedule,
) -> ImmoFinanceResult<ComputationOutput<ImportedScheduleAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.rows.len() < 3 {
        warnings.push(format!(
            "Only {} rows supplied — at least 3 are needed to infer a rate",
            input.rows.len()
        ));
    }

    let rate = infer_rate_from_schedule(&input.rows);
    if !rate.converged && input.rows.len() >= 3 {
        warnings.push("Rate solver did not converge — rate reported as unknown (0)".into());
    }

    let months_out_of_order = input
        .rows
        .windows(2)
        .any(|w| w[1].month <= w[0].month || w[1].date < w[0].date);
    if months_out_of_order {
        warnings.push("Imported rows are not in chronological order".into());
    }

    let analysis = ImportedScheduleAnalysis {
        schedule: AmortizationSchedule::from_rows(input.rows.clone()),
        rate,
    };

    Ok(with_metadata(
        "Imported schedule with Newton-Raphson rate inference",
        &serde_json::json!({ "rows": input.rows.len() }),
        warnings,
        start.elapsed().as_micros() as u64,
        analysis,
    ))
}
