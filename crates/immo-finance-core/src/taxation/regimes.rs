use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::financing::amortization::LoanYear;
use crate::investment::{TaxParameters, YearlyExpenses};
use crate::policy::TaxPolicy;
use crate::taxation::depreciation::{advance_year, DepreciationState, DepreciationYear};
use crate::types::{Money, Rate, RegimeBreakdown, TaxRegime};
use crate::ImmoFinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Balances carried from one tax year to the next.
///
/// Each regime reads the incoming state and writes only its own component,
/// so the four regimes never observe each other's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxCarryState {
    /// Réel-foncier deficit awaiting future foncier income
    pub foncier_deficit: Money,
    /// Réel-BIC operating deficit awaiting future BIC income
    pub bic_deficit: Money,
    pub depreciation: DepreciationState,
}

impl TaxCarryState {
    pub fn initial(params: &TaxParameters) -> Self {
        TaxCarryState {
            foncier_deficit: params.carried_forward_deficit.max(Decimal::ZERO),
            bic_deficit: Decimal::ZERO,
            depreciation: DepreciationState::new(
                params.building_value,
                params.building_amortization_years,
                params.furniture_value,
                params.furniture_amortization_years,
                params.depreciation_priority,
            ),
        }
    }
}

/// Tax outcome of one regime for one year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaxResult {
    /// Rent (bare or furnished) plus recovered charges
    pub gross_income: Money,
    /// Charges deducted from gross income; the flat allowance under micro regimes
    pub deductions: Money,
    pub depreciation_used: Money,
    /// Negative when a foncier deficit is offset against global income
    pub taxable_income: Money,
    pub tax: Money,
    pub social_charges: Money,
    pub total_tax: Money,
    /// Gross income minus cash charges minus total tax
    pub net_income: Money,
    /// Deficit of this regime still available to later years
    pub deficit_carried_forward: Money,
}

/// All four regimes for one year, plus the state to feed into the next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearTaxation {
    pub year: i32,
    pub regimes: RegimeBreakdown<TaxResult>,
    pub depreciation: DepreciationYear,
    pub next_state: TaxCarryState,
    pub warnings: Vec<String>,
}

/// Read-only rates shared by every regime in a year.
struct YearRates {
    marginal: Rate,
    social: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute the four regimes for `year`.
///
/// A missing expense record is treated as all-zero and reported as a
/// warning, as is an unset marginal rate.
pub fn compute_year(
    year: i32,
    expenses: Option<&YearlyExpenses>,
    loan: &LoanYear,
    state: &TaxCarryState,
    params: &TaxParameters,
    policy: &TaxPolicy,
) -> ImmoFinanceResult<YearTaxation> {
    let mut warnings: Vec<String> = Vec::new();

    let empty = YearlyExpenses::empty(year);
    let expenses = match expenses {
        Some(e) => e,
        None => {
            warnings.push(format!(
                "No expense record for {year} — income and charges treated as zero"
            ));
            &empty
        }
    };
    if params.marginal_rate.is_none() {
        warnings.push(format!("Marginal tax rate not set for {year} — using 0%"));
    }
    if expenses.rent > policy.micro_foncier_threshold {
        warnings.push(format!(
            "Rent {} exceeds the micro-foncier threshold of {} in {year}",
            expenses.rent, policy.micro_foncier_threshold
        ));
    }
    if expenses.furnished_rent > policy.micro_bic_threshold {
        warnings.push(format!(
            "Furnished rent {} exceeds the micro-BIC threshold of {} in {year}",
            expenses.furnished_rent, policy.micro_bic_threshold
        ));
    }

    let rates = YearRates {
        marginal: params.marginal_rate_or_zero(),
        social: params.social_charges_rate(policy),
    };

    let micro_foncier = compute_micro(
        expenses,
        false,
        params.micro_foncier_allowance(policy),
        &rates,
    );
    let micro_bic = compute_micro(expenses, true, params.micro_bic_allowance(policy), &rates);
    let (reel_foncier, foncier_deficit) = compute_reel_foncier(
        expenses,
        loan,
        state.foncier_deficit,
        params.deficit_ceiling(policy),
        &rates,
    );
    let (reel_bic, bic_deficit, depreciation, next_ledger) =
        compute_reel_bic(year, expenses, loan, state, &rates)?;

    for warning in &warnings {
        tracing::warn!(year, "{warning}");
    }

    Ok(YearTaxation {
        year,
        regimes: RegimeBreakdown {
            micro_foncier,
            reel_foncier,
            micro_bic,
            reel_bic,
        },
        depreciation,
        next_state: TaxCarryState {
            foncier_deficit,
            bic_deficit,
            depreciation: next_ledger,
        },
        warnings,
    })
}

// ---------------------------------------------------------------------------
// Regimes
// ---------------------------------------------------------------------------

/// Flat-allowance regimes: taxable = rent * (1 - allowance).
fn compute_micro(
    expenses: &YearlyExpenses,
    furnished: bool,
    allowance: Rate,
    rates: &YearRates,
) -> TaxResult {
    let rent = if furnished {
        expenses.furnished_rent
    } else {
        expenses.rent
    };
    let deductions = rent * allowance;
    let taxable_income = rent - deductions;
    finish(
        expenses.receipts(furnished),
        deductions,
        Decimal::ZERO,
        taxable_income,
        expenses.operating_charges(),
        Decimal::ZERO,
        rates,
    )
}

/// Real charges with a capped global-income deficit.
///
/// The loan-interest share of a deficit, and anything above the ceiling,
/// only offsets future foncier income.
fn compute_reel_foncier(
    expenses: &YearlyExpenses,
    loan: &LoanYear,
    carried_in: Money,
    ceiling: Money,
    rates: &YearRates,
) -> (TaxResult, Money) {
    let receipts = expenses.receipts(false);
    let loan_costs = loan.interest + loan.insurance;
    let deductions = expenses.deductible_charges() + loan_costs;
    let result = receipts - deductions;

    let (taxable_income, carried_out) = if result >= Decimal::ZERO {
        let offset = carried_in.min(result);
        (result - offset, carried_in - offset)
    } else {
        let deficit = -result;
        let interest_share = deficit.min(loan_costs);
        let global_offset = (deficit - interest_share).min(ceiling);
        (-global_offset, carried_in + deficit - global_offset)
    };

    let tax_result = finish(
        receipts,
        deductions,
        Decimal::ZERO,
        taxable_income,
        expenses.operating_charges(),
        carried_out,
        rates,
    );
    (tax_result, carried_out)
}

/// Real charges plus depreciation limited to the positive result.
fn compute_reel_bic(
    year: i32,
    expenses: &YearlyExpenses,
    loan: &LoanYear,
    state: &TaxCarryState,
    rates: &YearRates,
) -> ImmoFinanceResult<(TaxResult, Money, DepreciationYear, DepreciationState)> {
    let receipts = expenses.receipts(true);
    let deductions = expenses.deductible_charges() + loan.interest + loan.insurance;
    let result = receipts - deductions;

    let (base, carried_out) = if result >= Decimal::ZERO {
        let offset = state.bic_deficit.min(result);
        (result - offset, state.bic_deficit - offset)
    } else {
        (Decimal::ZERO, state.bic_deficit - result)
    };

    let (depreciation, next_ledger) = advance_year(&state.depreciation, year, base)?;
    let taxable_income = base - depreciation.total_used;

    let tax_result = finish(
        receipts,
        deductions,
        depreciation.total_used,
        taxable_income,
        expenses.operating_charges(),
        carried_out,
        rates,
    );
    Ok((tax_result, carried_out, depreciation, next_ledger))
}

fn finish(
    gross_income: Money,
    deductions: Money,
    depreciation_used: Money,
    taxable_income: Money,
    cash_charges: Money,
    deficit_carried_forward: Money,
    rates: &YearRates,
) -> TaxResult {
    let tax = taxable_income * rates.marginal;
    let social_charges = taxable_income.max(Decimal::ZERO) * rates.social;
    let total_tax = tax + social_charges;
    TaxResult {
        gross_income,
        deductions,
        depreciation_used,
        taxable_income,
        tax,
        social_charges,
        total_tax,
        net_income: gross_income - cash_charges - total_tax,
        deficit_carried_forward,
    }
}

/// Result of a single regime, computed exactly as in the batch.
pub fn compute_regime(
    regime: TaxRegime,
    year: i32,
    expenses: Option<&YearlyExpenses>,
    loan: &LoanYear,
    state: &TaxCarryState,
    params: &TaxParameters,
    policy: &TaxPolicy,
) -> ImmoFinanceResult<TaxResult> {
    let batch = compute_year(year, expenses, loan, state, params, policy)?;
    Ok(batch.regimes.get(regime).clone())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> TaxParameters {
        TaxParameters {
            marginal_rate: Some(dec!(0.30)),
            building_value: dec!(150000),
            building_amortization_years: 30,
            furniture_value: dec!(8000),
            furniture_amortization_years: 8,
            ..Default::default()
        }
    }

    fn expenses() -> YearlyExpenses {
        YearlyExpenses {
            year: 2025,
            rent: dec!(9000),
            furnished_rent: dec!(10800),
            property_tax: dec!(900),
            condo_fees: dec!(1200),
            insurance: dec!(200),
            management_fees: dec!(500),
            repairs: dec!(200),
            other_non_deductible: dec!(100),
            ..Default::default()
        }
    }

    fn loan() -> LoanYear {
        LoanYear {
            year: 2025,
            payments: dec!(8000),
            interest: dec!(3000),
            insurance: dec!(240),
            principal_repaid: dec!(5000),
        }
    }

    #[test]
    fn test_micro_foncier_flat_allowance() {
        let p = params();
        let state = TaxCarryState::initial(&p);
        let y = compute_year(2025, Some(&expenses()), &loan(), &state, &p, &TaxPolicy::default())
            .unwrap();
        let r = &y.regimes.micro_foncier;
        assert_eq!(r.taxable_income, dec!(6300));
        assert_eq!(r.tax, dec!(1890));
        assert_eq!(r.social_charges, dec!(1083.6));
        assert_eq!(r.total_tax, dec!(2973.6));
        // 9000 - 3100 charges - 2973.6
        assert_eq!(r.net_income, dec!(2926.4));
    }

    #[test]
    fn test_micro_bic_flat_allowance() {
        let p = params();
        let state = TaxCarryState::initial(&p);
        let y = compute_year(2025, Some(&expenses()), &loan(), &state, &p, &TaxPolicy::default())
            .unwrap();
        assert_eq!(y.regimes.micro_bic.taxable_income, dec!(5400));
    }

    #[test]
    fn test_reel_foncier_positive_result() {
        let p = params();
        let state = TaxCarryState::initial(&p);
        let y = compute_year(2025, Some(&expenses()), &loan(), &state, &p, &TaxPolicy::default())
            .unwrap();
        // 9000 - (3000 charges + 3240 loan costs)
        assert_eq!(y.regimes.reel_foncier.taxable_income, dec!(2760));
        assert_eq!(y.next_state.foncier_deficit, Decimal::ZERO);
    }

    #[test]
    fn test_reel_foncier_deficit_split() {
        let p = params();
        let state = TaxCarryState::initial(&p);
        let mut e = expenses();
        e.repairs = dec!(20000);
        let y = compute_year(2025, Some(&e), &loan(), &state, &p, &TaxPolicy::default()).unwrap();
        // result = 9000 - (22800 + 3240) = -17040; interest share 3240;
        // 13800 non-interest, 10700 against global income, rest carried
        let r = &y.regimes.reel_foncier;
        assert_eq!(r.taxable_income, dec!(-10700));
        assert_eq!(r.tax, dec!(-3210));
        assert_eq!(r.social_charges, Decimal::ZERO);
        assert_eq!(y.next_state.foncier_deficit, dec!(6340));
    }

    #[test]
    fn test_reel_foncier_consumes_carried_deficit() {
        let mut p = params();
        p.carried_forward_deficit = dec!(1000);
        let state = TaxCarryState::initial(&p);
        let y = compute_year(2025, Some(&expenses()), &loan(), &state, &p, &TaxPolicy::default())
            .unwrap();
        assert_eq!(y.regimes.reel_foncier.taxable_income, dec!(1760));
        assert_eq!(y.next_state.foncier_deficit, Decimal::ZERO);
    }

    #[test]
    fn test_reel_bic_depreciation_limited_to_result() {
        let p = params();
        let state = TaxCarryState::initial(&p);
        let y = compute_year(2025, Some(&expenses()), &loan(), &state, &p, &TaxPolicy::default())
            .unwrap();
        // result = 10800 - 6240 = 4560 < 5000 + 1000 theoretical
        let r = &y.regimes.reel_bic;
        assert_eq!(r.depreciation_used, dec!(4560));
        assert_eq!(r.taxable_income, Decimal::ZERO);
        assert_eq!(r.total_tax, Decimal::ZERO);
        assert_eq!(y.depreciation.building.used, dec!(4560));
        assert_eq!(y.next_state.depreciation.backlog(), dec!(1440));
    }

    #[test]
    fn test_reel_bic_operating_deficit_carried() {
        let p = params();
        let state = TaxCarryState::initial(&p);
        let mut e = expenses();
        e.repairs = dec!(6000);
        let y = compute_year(2025, Some(&e), &loan(), &state, &p, &TaxPolicy::default()).unwrap();
        // 10800 - 12040 = -1240
        assert_eq!(y.next_state.bic_deficit, dec!(1240));
        assert_eq!(y.regimes.reel_bic.depreciation_used, Decimal::ZERO);
        assert_eq!(y.next_state.depreciation.backlog(), dec!(6000));
    }

    #[test]
    fn test_missing_record_and_rate_warn() {
        let mut p = params();
        p.marginal_rate = None;
        let state = TaxCarryState::initial(&p);
        let y = compute_year(2025, None, &LoanYear::default(), &state, &p, &TaxPolicy::default())
            .unwrap();
        assert_eq!(y.warnings.len(), 2);
        assert_eq!(y.regimes.micro_foncier, TaxResult::default());
    }

    #[test]
    fn test_single_regime_matches_batch() {
        let p = params();
        let state = TaxCarryState::initial(&p);
        let policy = TaxPolicy::default();
        let batch = compute_year(2025, Some(&expenses()), &loan(), &state, &p, &policy).unwrap();
        for regime in TaxRegime::ALL {
            let single =
                compute_regime(regime, 2025, Some(&expenses()), &loan(), &state, &p, &policy)
                    .unwrap();
            assert_eq!(&single, batch.regimes.get(regime));
        }
    }
}
