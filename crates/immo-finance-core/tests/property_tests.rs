use chrono::NaiveDate;
use immo_finance_core::financing::payment::{monthly_payment, solve_monthly_rate};
use immo_finance_core::financing::{build_schedule, DeferralKind, LoanTerms};
use immo_finance_core::taxation::depreciation::{replay, DepreciationPriority, DepreciationState};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn loan(principal: u32, rate_bp: u32, term_years: u32) -> LoanTerms {
    LoanTerms {
        principal: Decimal::from(principal),
        annual_rate: Decimal::new(i64::from(rate_bp), 4),
        term_years,
        deferral_kind: DeferralKind::None,
        deferral_months: 0,
        start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        monthly_insurance: Decimal::ZERO,
    }
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(48))]

    #[test]
    fn prop_schedule_repays_exact_principal(
        principal in 10_000u32..1_000_000,
        rate_bp in 10u32..1_000,
        term_years in 1u32..31
    ) {
        let schedule = build_schedule(&loan(principal, rate_bp, term_years)).unwrap();
        let repaid: Decimal = schedule.rows.iter().map(|r| r.principal_paid).sum();

        prop_assert_eq!(schedule.rows.len() as u32, term_years * 12);
        prop_assert!((repaid - Decimal::from(principal)).abs() < dec!(0.01));
        prop_assert_eq!(schedule.rows.last().unwrap().remaining_balance, Decimal::ZERO);
    }

    #[test]
    fn prop_inferred_rate_reproduces_payment(
        principal in 10_000u32..1_000_000,
        monthly_rate_bp in 20u32..900,
        months in 12u32..361
    ) {
        let p = Decimal::from(principal);
        let r = Decimal::new(i64::from(monthly_rate_bp), 4);
        let m = monthly_payment(p, r, months).unwrap();

        let inferred = solve_monthly_rate(p, m, months);
        prop_assert!(inferred.converged);

        let replayed = monthly_payment(p, inferred.monthly_rate, months).unwrap();
        prop_assert!(((replayed - m) / m).abs() < dec!(0.000001));
    }

    #[test]
    fn prop_depreciation_never_exceeds_bounds(
        building in 0u32..500_000,
        building_years in 0u32..40,
        furniture in 0u32..30_000,
        furniture_years in 0u32..10,
        incomes in proptest::collection::vec(-20_000i32..40_000, 1..35),
        furniture_first in any::<bool>()
    ) {
        let priority = if furniture_first {
            DepreciationPriority::FurnitureFirst
        } else {
            DepreciationPriority::BuildingFirst
        };
        let initial = DepreciationState::new(
            Decimal::from(building),
            building_years,
            Decimal::from(furniture),
            furniture_years,
            priority,
        );
        let years: Vec<(i32, Decimal)> = incomes
            .iter()
            .enumerate()
            .map(|(i, income)| (2024 + i as i32, Decimal::from(*income)))
            .collect();

        let (movements, end) = replay(&initial, &years).unwrap();

        for ledger in [&end.building, &end.furniture] {
            prop_assert!(ledger.cumulative_used <= ledger.cumulative_theoretical);
            prop_assert!(ledger.cumulative_theoretical <= ledger.asset_value);
        }
        for movement in movements {
            prop_assert!(movement.total_used <= movement.available_base);
        }
    }
}
