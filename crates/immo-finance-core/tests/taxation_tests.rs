use chrono::NaiveDate;
use immo_finance_core::financing::{DeferralKind, LoanTerms};
use immo_finance_core::investment::{
    Investment, PurchaseCosts, SaleParameters, TaxParameters, YearlyExpenses,
};
use immo_finance_core::policy::TaxPolicy;
use immo_finance_core::taxation::depreciation::{replay, DepreciationPriority, DepreciationState};
use immo_finance_core::taxation::{calculate_all_tax_regimes, tax_timeline};
use immo_finance_core::{ImmoFinanceError, TaxRegime};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn no_loan() -> LoanTerms {
    LoanTerms {
        principal: Decimal::ZERO,
        annual_rate: Decimal::ZERO,
        term_years: 0,
        deferral_kind: DeferralKind::None,
        deferral_months: 0,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        monthly_insurance: Decimal::ZERO,
    }
}

/// Furnished studio bought cash: 5000/yr building depreciation, a lean
/// first year followed by a full one.
fn furnished_studio() -> Investment {
    Investment {
        name: "Studio".into(),
        purchase: PurchaseCosts {
            purchase_price: dec!(150_000),
            ..Default::default()
        },
        loan: no_loan(),
        schedule_override: None,
        project_start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        project_end_date: NaiveDate::from_ymd_opt(2034, 1, 1),
        expenses: vec![
            YearlyExpenses {
                year: 2024,
                rent: dec!(2500),
                furnished_rent: dec!(3000),
                ..Default::default()
            },
            YearlyExpenses {
                year: 2025,
                rent: dec!(8000),
                furnished_rent: dec!(10_000),
                ..Default::default()
            },
        ],
        tax: TaxParameters {
            marginal_rate: Some(dec!(0.30)),
            building_value: dec!(150_000),
            building_amortization_years: 30,
            ..Default::default()
        },
        sale: SaleParameters::default(),
        policy: TaxPolicy::default(),
    }
}

// ===========================================================================
// Multi-year replay
// ===========================================================================

#[test]
fn test_depreciation_backlog_absorbed_next_year() {
    let out = calculate_all_tax_regimes(&furnished_studio(), 2025).unwrap();
    let report = &out.result;

    // 2024: base 3000, 2000 deferred; 2025: 5000 + 2000 used on a 10000 base
    assert_eq!(report.depreciation.total_used, dec!(7000));
    assert_eq!(report.regimes.reel_bic.depreciation_used, dec!(7000));
    assert_eq!(report.regimes.reel_bic.taxable_income, dec!(3000));
    assert_eq!(report.carry_state.depreciation.backlog(), Decimal::ZERO);
    assert_eq!(report.carry_state.depreciation.cumulative_used(), dec!(10_000));
    assert!(out.warnings.is_empty());
}

#[test]
fn test_first_year_in_isolation() {
    let report = calculate_all_tax_regimes(&furnished_studio(), 2024)
        .unwrap()
        .result;
    assert_eq!(report.regimes.reel_bic.taxable_income, Decimal::ZERO);
    assert_eq!(report.regimes.reel_bic.total_tax, Decimal::ZERO);
    assert_eq!(report.carry_state.depreciation.backlog(), dec!(2000));
    // micro-BIC: 3000 * 50% = 1500 taxable
    assert_eq!(report.regimes.micro_bic.taxable_income, dec!(1500));
}

#[test]
fn test_missing_year_degrades_with_warning() {
    let out = calculate_all_tax_regimes(&furnished_studio(), 2026).unwrap();
    assert_eq!(out.result.regimes.micro_foncier.taxable_income, Decimal::ZERO);
    assert!(out.warnings.iter().any(|w| w.contains("2026")));
    // unused depreciation keeps accumulating
    assert_eq!(out.result.carry_state.depreciation.backlog(), dec!(5000));
}

#[test]
fn test_year_before_project_rejected() {
    let err = calculate_all_tax_regimes(&furnished_studio(), 2023).unwrap_err();
    assert!(matches!(err, ImmoFinanceError::Configuration { .. }));
}

#[test]
fn test_regimes_do_not_interact() {
    let inv = furnished_studio();
    let schedule = inv.active_schedule().unwrap();
    let timeline = tax_timeline(&inv, &schedule, 2024, 2025).unwrap();

    let mut without_depreciation = inv.clone();
    without_depreciation.tax.building_value = Decimal::ZERO;
    let other = tax_timeline(&without_depreciation, &schedule, 2024, 2025).unwrap();

    for (a, b) in timeline.iter().zip(&other) {
        for regime in [TaxRegime::MicroFoncier, TaxRegime::ReelFoncier, TaxRegime::MicroBic] {
            assert_eq!(a.regimes.get(regime), b.regimes.get(regime));
        }
    }
}

#[test]
fn test_micro_threshold_warning() {
    let mut inv = furnished_studio();
    inv.expenses[1].rent = dec!(16_000);
    let out = calculate_all_tax_regimes(&inv, 2025).unwrap();
    assert!(out.warnings.iter().any(|w| w.contains("micro-foncier")));
    // still computed
    assert_eq!(
        out.result.regimes.micro_foncier.taxable_income,
        dec!(11_200)
    );
}

// ===========================================================================
// Depreciation ledger
// ===========================================================================

#[test]
fn test_priority_is_overridable() {
    let incomes = [(2024, dec!(4000))];
    let building_first = DepreciationState::new(
        dec!(90_000),
        30,
        dec!(7000),
        7,
        DepreciationPriority::BuildingFirst,
    );
    let (years, _) = replay(&building_first, &incomes).unwrap();
    assert_eq!(years[0].building.used, dec!(3000));
    assert_eq!(years[0].furniture.used, dec!(1000));

    let furniture_first = DepreciationState {
        priority: DepreciationPriority::FurnitureFirst,
        ..building_first
    };
    let (years, _) = replay(&furniture_first, &[(2024, dec!(2500))]).unwrap();
    assert_eq!(years[0].furniture.used, dec!(1000));
    assert_eq!(years[0].building.used, dec!(1500));
}

#[test]
fn test_out_of_order_advance_rejected() {
    let state = DepreciationState::new(dec!(90_000), 30, Decimal::ZERO, 0, Default::default());
    let err = replay(&state, &[(2024, dec!(1000)), (2026, dec!(1000))]).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn test_fully_depreciated_asset_stops() {
    let state = DepreciationState::new(dec!(3000), 3, Decimal::ZERO, 0, Default::default());
    let incomes: Vec<(i32, Decimal)> = (2024..2030).map(|y| (y, dec!(10_000))).collect();
    let (years, end) = replay(&state, &incomes).unwrap();
    assert_eq!(end.cumulative_theoretical(), dec!(3000));
    assert_eq!(end.cumulative_used(), dec!(3000));
    assert_eq!(years[3].total_used, Decimal::ZERO);
}
