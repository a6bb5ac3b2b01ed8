use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::capital_gains::sale::{
    gain_basis, tax_capital_gain, CapitalGainResult, GainBasis, SaleInput,
};
use crate::error::ImmoFinanceError;
use crate::financing::amortization::{early_repayment_penalty, AmortizationSchedule};
use crate::investment::Investment;
use crate::taxation::regimes::YearTaxation;
use crate::taxation::timeline::tax_timeline;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, RegimeBreakdown, TaxRegime};
use crate::ImmoFinanceResult;

/// Sale of the project at its end date, under every regime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleSummary {
    pub purchase_year: i32,
    pub sale_year: i32,
    pub basis: GainBasis,
    /// Loan balance repaid out of the sale price
    pub outstanding_loan: Money,
    pub early_repayment_penalty: Money,
    pub loan_rate: Rate,
    /// Réel-BIC depreciation deducted through the sale year
    pub cumulative_used_depreciation: Money,
    pub regimes: RegimeBreakdown<CapitalGainResult>,
    /// Net selling price less loan repayment, penalty and gain tax
    pub net_proceeds: RegimeBreakdown<Money>,
}

/// Capital-gain tax and net sale proceeds of the four regimes.
pub fn calculate_all_capital_gain_regimes(
    investment: &Investment,
) -> ImmoFinanceResult<ComputationOutput<SaleSummary>> {
    let start = Instant::now();
    investment.validate()?;
    let years = investment.project_years()?;

    let schedule = investment.active_schedule()?;
    let timeline = tax_timeline(investment, &schedule, *years.start(), *years.end())?;
    let (summary, warnings) = summarise_sale(investment, &schedule, &timeline)?;

    Ok(with_metadata(
        "Resale: holding-period allowances, LMNP depreciation recapture, LMP short/long-term split",
        &serde_json::json!({
            "investment": investment.name,
            "appreciation_rate": investment.sale.appreciation_rate.to_string(),
            "lessor_status": investment.sale.lessor_status,
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        summary,
    ))
}

/// Sale summary from an already replayed tax timeline ending at the sale year.
pub(crate) fn summarise_sale(
    investment: &Investment,
    schedule: &AmortizationSchedule,
    timeline: &[YearTaxation],
) -> ImmoFinanceResult<(SaleSummary, Vec<String>)> {
    let years = investment.project_years()?;
    let (purchase_year, sale_year) = (*years.start(), *years.end());
    let mut warnings = Vec::new();

    let cumulative_used_depreciation = timeline
        .iter()
        .find(|t| t.year == sale_year)
        .map(|t| t.next_state.depreciation.cumulative_used())
        .ok_or_else(|| {
            ImmoFinanceError::InsufficientData(format!("tax timeline does not reach {sale_year}"))
        })?;

    let input = SaleInput {
        regime: TaxRegime::MicroFoncier,
        lessor_status: investment.sale.lessor_status,
        purchase_year,
        sale_year,
        purchase_price: investment.purchase.purchase_price,
        notary_fees: investment.purchase.notary_fees,
        acquisition_agency_fees: investment.purchase.acquisition_agency_fees,
        improvement_works: investment.purchase.improvement_works,
        appreciation_rate: investment.sale.appreciation_rate,
        sale_agency_fee_rate: investment.sale.sale_agency_fee_rate,
        marginal_rate: investment.tax.marginal_rate_or_zero(),
        cumulative_used_depreciation,
        flat_acquisition_fees: investment.sale.flat_acquisition_fees,
        flat_works_allowance: investment.sale.flat_works_allowance,
    };
    let basis = gain_basis(&input, &investment.policy)?;
    if investment.tax.marginal_rate.is_none() {
        warnings.push("Marginal tax rate not set: depreciation recapture taxed at 0%".into());
    }

    let outstanding_loan = schedule.balance_at_year_end(sale_year);
    let loan_rate = investment.loan_annual_rate();
    if loan_rate.is_zero() && !outstanding_loan.is_zero() {
        warnings.push("Loan rate unknown: statutory repayment penalty computed as zero".into());
    }
    let penalty = early_repayment_penalty(
        &investment.sale.early_repayment_penalty,
        outstanding_loan,
        loan_rate,
        &investment.policy,
    );

    let regimes = RegimeBreakdown::from_fn(|regime| {
        tax_capital_gain(
            regime,
            input.lessor_status,
            basis.gross_capital_gain,
            basis.holding_years,
            input.marginal_rate,
            cumulative_used_depreciation,
            &investment.policy,
        )
    });
    let net_proceeds = regimes.map(|_, gain| {
        basis.net_selling_price - outstanding_loan - penalty - gain.total_tax
    });

    tracing::debug!(
        sale_year,
        gross_gain = %basis.gross_capital_gain,
        outstanding = %outstanding_loan,
        "sale summarised"
    );

    Ok((
        SaleSummary {
            purchase_year,
            sale_year,
            basis,
            outstanding_loan,
            early_repayment_penalty: penalty,
            loan_rate,
            cumulative_used_depreciation,
            regimes,
            net_proceeds,
        },
        warnings,
    ))
}
