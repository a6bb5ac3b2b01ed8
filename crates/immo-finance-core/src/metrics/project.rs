use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::capital_gains::report::{summarise_sale, SaleSummary};
use crate::error::ImmoFinanceError;
use crate::investment::Investment;
use crate::taxation::regimes::TaxResult;
use crate::taxation::timeline::tax_timeline;
use crate::time_value::irr;
use crate::types::{with_metadata, ComputationOutput, Money, Rate, RegimeBreakdown, TaxRegime};
use crate::ImmoFinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Average yields of one letting mode over the project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Yields {
    /// Average annual rent over purchase price
    pub gross_yield: Rate,
    /// Average receipts less operating charges over total acquisition cost, before tax
    pub net_yield: Rate,
}

/// Cash position of one calendar year.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearlyCashFlow {
    pub year: i32,
    pub receipts_unfurnished: Money,
    pub receipts_furnished: Money,
    pub operating_charges: Money,
    pub loan_payments: Money,
    pub loan_interest: Money,
    pub loan_insurance: Money,
    pub taxes: RegimeBreakdown<TaxResult>,
    /// Receipts less charges, loan outflows and tax
    pub cash_flow: RegimeBreakdown<Money>,
}

/// Whole-project summary from purchase to sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialMetrics {
    pub total_acquisition_cost: Money,
    /// Acquisition cost not financed by the loan
    pub personal_contribution: Money,
    pub unfurnished_yields: Yields,
    pub furnished_yields: Yields,
    pub yearly: Vec<YearlyCashFlow>,
    pub cumulative_cash_flow: RegimeBreakdown<Money>,
    pub sale: SaleSummary,
    /// Cumulative cash flow plus net proceeds less personal contribution
    pub total_return: RegimeBreakdown<Money>,
    /// Annual equity IRR; `None` when the solver fails
    pub equity_irr: RegimeBreakdown<Option<Rate>>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Aggregate loan, taxation and sale over the whole project horizon.
///
/// Equity flows are annual: the personal contribution at t = 0, each
/// project year's cash flow at the end of that year, and the net sale
/// proceeds added to the final year.
pub fn calculate_financial_metrics(
    investment: &Investment,
) -> ImmoFinanceResult<ComputationOutput<FinancialMetrics>> {
    let start = Instant::now();
    investment.validate()?;
    let years = investment.project_years()?;
    let (first_year, sale_year) = (*years.start(), *years.end());

    let schedule = investment.active_schedule()?;
    let timeline = tax_timeline(investment, &schedule, first_year, sale_year)?;
    let mut warnings: Vec<String> = timeline
        .iter()
        .flat_map(|t| t.warnings.iter().cloned())
        .collect();

    let (sale, sale_warnings) = summarise_sale(investment, &schedule, &timeline)?;
    warnings.extend(sale_warnings);

    let total_acquisition_cost = investment.purchase.total();
    let personal_contribution = total_acquisition_cost - investment.borrowed_amount();

    // --- Yearly cash flows ---
    let mut yearly = Vec::with_capacity(timeline.len());
    for taxation in timeline {
        let year = taxation.year;
        let loan = schedule.year_totals(year);
        let (receipts_unfurnished, receipts_furnished, operating_charges) =
            match investment.expenses_for(year) {
                Some(e) => (e.receipts(false), e.receipts(true), e.operating_charges()),
                None => (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO),
            };
        let loan_outflow = loan.payments + loan.insurance;

        let cash_flow = taxation.regimes.map(|regime, tax| {
            let receipts = if regime.is_furnished() {
                receipts_furnished
            } else {
                receipts_unfurnished
            };
            receipts - operating_charges - loan_outflow - tax.total_tax
        });

        yearly.push(YearlyCashFlow {
            year,
            receipts_unfurnished,
            receipts_furnished,
            operating_charges,
            loan_payments: loan.payments,
            loan_interest: loan.interest,
            loan_insurance: loan.insurance,
            taxes: taxation.regimes,
            cash_flow,
        });
    }

    let cumulative_cash_flow: RegimeBreakdown<Money> =
        RegimeBreakdown::from_fn(|regime| yearly.iter().map(|y| *y.cash_flow.get(regime)).sum());
    let total_return = RegimeBreakdown::from_fn(|regime| {
        *cumulative_cash_flow.get(regime) + *sale.net_proceeds.get(regime) - personal_contribution
    });

    // --- Equity IRR ---
    let equity_irr = RegimeBreakdown::from_fn(|regime| {
        let flows = equity_flows(personal_contribution, &yearly, regime, &sale);
        match irr(&flows, dec!(0.05)) {
            Ok(rate) => Some(rate),
            Err(e) => {
                warnings.push(format!("Equity IRR unavailable for {regime}: {e}"));
                None
            }
        }
    });

    let metrics = FinancialMetrics {
        total_acquisition_cost,
        personal_contribution,
        unfurnished_yields: yields(investment, &yearly, false, total_acquisition_cost)?,
        furnished_yields: yields(investment, &yearly, true, total_acquisition_cost)?,
        yearly,
        cumulative_cash_flow,
        sale,
        total_return,
        equity_irr,
    };

    for warning in &warnings {
        tracing::warn!("{warning}");
    }

    Ok(with_metadata(
        "Project cash flows, yields, net sale proceeds and equity IRR per tax regime",
        &serde_json::json!({
            "investment": investment.name,
            "first_year": first_year,
            "sale_year": sale_year,
        }),
        warnings,
        start.elapsed().as_micros() as u64,
        metrics,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn equity_flows(
    personal_contribution: Money,
    yearly: &[YearlyCashFlow],
    regime: TaxRegime,
    sale: &SaleSummary,
) -> Vec<Money> {
    let mut flows = Vec::with_capacity(yearly.len() + 1);
    flows.push(-personal_contribution);
    flows.extend(yearly.iter().map(|y| *y.cash_flow.get(regime)));
    if let Some(last) = flows.last_mut() {
        *last += *sale.net_proceeds.get(regime);
    }
    flows
}

fn yields(
    investment: &Investment,
    yearly: &[YearlyCashFlow],
    furnished: bool,
    total_acquisition_cost: Money,
) -> ImmoFinanceResult<Yields> {
    if yearly.is_empty() {
        return Err(ImmoFinanceError::InsufficientData(
            "no project year to average".into(),
        ));
    }
    let count = Decimal::from(yearly.len() as u64);
    let rent: Money = yearly
        .iter()
        .filter_map(|y| investment.expenses_for(y.year))
        .map(|e| if furnished { e.furnished_rent } else { e.rent })
        .sum();
    let net: Money = yearly
        .iter()
        .map(|y| {
            let receipts = if furnished {
                y.receipts_furnished
            } else {
                y.receipts_unfurnished
            };
            receipts - y.operating_charges
        })
        .sum();

    let price = investment.purchase.purchase_price;
    Ok(Yields {
        gross_yield: if price.is_zero() {
            Decimal::ZERO
        } else {
            rent / count / price
        },
        net_yield: if total_acquisition_cost.is_zero() {
            Decimal::ZERO
        } else {
            net / count / total_acquisition_cost
        },
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::financing::amortization::{EarlyRepaymentPenalty, LoanTerms};
    use crate::investment::{PurchaseCosts, SaleParameters, TaxParameters, YearlyExpenses};
    use crate::policy::TaxPolicy;
    use chrono::NaiveDate;

    /// Cash purchase so the cash flows are easy to verify by hand.
    fn cash_purchase() -> Investment {
        Investment {
            name: "Cash".into(),
            purchase: PurchaseCosts {
                purchase_price: dec!(100000),
                notary_fees: dec!(8000),
                ..Default::default()
            },
            loan: LoanTerms {
                principal: Decimal::ZERO,
                annual_rate: Decimal::ZERO,
                term_years: 0,
                deferral_kind: Default::default(),
                deferral_months: 0,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                monthly_insurance: Decimal::ZERO,
            },
            schedule_override: None,
            project_start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
            project_end_date: NaiveDate::from_ymd_opt(2026, 12, 31),
            expenses: (2024..=2026)
                .map(|year| YearlyExpenses {
                    year,
                    rent: dec!(6000),
                    furnished_rent: dec!(7200),
                    property_tax: dec!(1000),
                    ..Default::default()
                })
                .collect(),
            tax: TaxParameters {
                marginal_rate: Some(dec!(0.30)),
                ..Default::default()
            },
            sale: SaleParameters {
                early_repayment_penalty: EarlyRepaymentPenalty::None,
                ..Default::default()
            },
            policy: TaxPolicy::default(),
        }
    }

    #[test]
    fn test_cash_purchase_metrics() {
        let out = calculate_financial_metrics(&cash_purchase()).unwrap();
        let m = &out.result;
        assert_eq!(m.total_acquisition_cost, dec!(108000));
        assert_eq!(m.personal_contribution, dec!(108000));
        assert_eq!(m.yearly.len(), 3);
        assert_eq!(m.unfurnished_yields.gross_yield, dec!(0.06));
        assert_eq!(m.furnished_yields.gross_yield, dec!(0.072));

        // micro-foncier: taxable 4200, tax 1260 + 722.4
        let y = &m.yearly[0];
        assert_eq!(*y.cash_flow.get(TaxRegime::MicroFoncier), dec!(3017.6));
        assert_eq!(
            *m.cumulative_cash_flow.get(TaxRegime::MicroFoncier),
            dec!(9052.8)
        );
        assert!(m.sale.outstanding_loan.is_zero());
    }

    #[test]
    fn test_no_gain_sale_returns_cost() {
        let out = calculate_financial_metrics(&cash_purchase()).unwrap();
        let m = &out.result;
        // zero appreciation: price recovered, no gain tax
        for regime in TaxRegime::ALL {
            assert_eq!(*m.sale.net_proceeds.get(regime), dec!(100000));
            assert_eq!(
                *m.total_return.get(regime),
                *m.cumulative_cash_flow.get(regime) - dec!(8000)
            );
        }
    }

    #[test]
    fn test_equity_irr_present_for_profitable_project() {
        let mut inv = cash_purchase();
        inv.sale.appreciation_rate = dec!(0.03);
        let out = calculate_financial_metrics(&inv).unwrap();
        let irr = out.result.equity_irr.get(TaxRegime::MicroBic).unwrap();
        assert!(irr > Decimal::ZERO && irr < dec!(0.2));
    }

    #[test]
    fn test_requires_project_dates() {
        let mut inv = cash_purchase();
        inv.project_end_date = None;
        assert!(matches!(
            calculate_financial_metrics(&inv).unwrap_err(),
            ImmoFinanceError::Configuration { .. }
        ));
    }
}
