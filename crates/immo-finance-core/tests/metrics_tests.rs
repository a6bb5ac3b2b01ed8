use chrono::NaiveDate;
use immo_finance_core::financing::{DeferralKind, LoanTerms};
use immo_finance_core::investment::{
    Investment, PurchaseCosts, SaleParameters, TaxParameters, YearlyExpenses,
};
use immo_finance_core::metrics::calculate_financial_metrics;
use immo_finance_core::policy::TaxPolicy;
use immo_finance_core::TaxRegime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Leveraged furnished flat held ten years.
fn leveraged_flat() -> Investment {
    Investment {
        name: "Leveraged T3".into(),
        purchase: PurchaseCosts {
            purchase_price: dec!(180_000),
            notary_fees: dec!(14_000),
            acquisition_agency_fees: dec!(6_000),
            loan_fees: dec!(1_500),
            furniture_cost: dec!(5_000),
            ..Default::default()
        },
        loan: LoanTerms {
            principal: dec!(170_000),
            annual_rate: dec!(0.036),
            term_years: 20,
            deferral_kind: DeferralKind::Partial,
            deferral_months: 6,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            monthly_insurance: dec!(25),
        },
        schedule_override: None,
        project_start_date: NaiveDate::from_ymd_opt(2024, 3, 10),
        project_end_date: NaiveDate::from_ymd_opt(2034, 3, 10),
        expenses: (2024..=2034)
            .map(|year| YearlyExpenses {
                year,
                rent: dec!(9_600),
                furnished_rent: dec!(11_400),
                recharged_charges: dec!(600),
                property_tax: dec!(950),
                condo_fees: dec!(1_400),
                insurance: dec!(180),
                repairs: dec!(300),
                other_non_deductible: dec!(120),
                ..Default::default()
            })
            .collect(),
        tax: TaxParameters {
            marginal_rate: Some(dec!(0.30)),
            building_value: dec!(150_000),
            building_amortization_years: 30,
            furniture_value: dec!(5_000),
            furniture_amortization_years: 7,
            ..Default::default()
        },
        sale: SaleParameters {
            appreciation_rate: dec!(0.015),
            sale_agency_fee_rate: dec!(0.04),
            ..Default::default()
        },
        policy: TaxPolicy::default(),
    }
}

#[test]
fn test_acquisition_and_contribution() {
    let m = calculate_financial_metrics(&leveraged_flat()).unwrap().result;
    assert_eq!(m.total_acquisition_cost, dec!(206_500));
    assert_eq!(m.personal_contribution, dec!(36_500));
    // 9600 / 180000
    assert_eq!(
        m.unfurnished_yields.gross_yield,
        dec!(9_600) / dec!(180_000)
    );
    // (12000 - 2950) / 206500
    assert_eq!(
        m.furnished_yields.net_yield,
        dec!(9_050) / dec!(206_500)
    );
}

#[test]
fn test_yearly_flows_follow_schedule() {
    let inv = leveraged_flat();
    let m = calculate_financial_metrics(&inv).unwrap().result;
    let schedule = inv.active_schedule().unwrap();

    assert_eq!(m.yearly.len(), 11);
    for y in &m.yearly {
        let loan = schedule.year_totals(y.year);
        assert_eq!(y.loan_payments, loan.payments);
        assert_eq!(y.loan_interest, loan.interest);
        assert_eq!(y.loan_insurance, loan.insurance);
    }
    // instalments start in April 2024: nine months of insurance
    assert_eq!(m.yearly[0].loan_insurance, dec!(225));

    let y = &m.yearly[1];
    let tax = &y.taxes.micro_foncier;
    let expected =
        dec!(10_200) - dec!(2_950) - y.loan_payments - y.loan_insurance - tax.total_tax;
    assert!((*y.cash_flow.get(TaxRegime::MicroFoncier) - expected).abs() < dec!(0.000001));
}

#[test]
fn test_cumulative_and_total_return() {
    let m = calculate_financial_metrics(&leveraged_flat()).unwrap().result;
    for regime in TaxRegime::ALL {
        let sum: Decimal = m.yearly.iter().map(|y| *y.cash_flow.get(regime)).sum();
        assert_eq!(*m.cumulative_cash_flow.get(regime), sum);
        assert_eq!(
            *m.total_return.get(regime),
            sum + *m.sale.net_proceeds.get(regime) - m.personal_contribution
        );
    }
    assert!(m.sale.outstanding_loan > Decimal::ZERO);
    assert!(m.sale.early_repayment_penalty > Decimal::ZERO);
}

#[test]
fn test_equity_irr_reported_per_regime() {
    let out = calculate_financial_metrics(&leveraged_flat()).unwrap();
    for regime in TaxRegime::ALL {
        match out.result.equity_irr.get(regime) {
            Some(rate) => assert!(*rate > dec!(-0.99) && *rate < dec!(10)),
            None => assert!(out
                .warnings
                .iter()
                .any(|w| w.contains(&regime.to_string()))),
        }
    }
}

#[test]
fn test_contribution_with_imported_schedule() {
    let mut inv = leveraged_flat();
    let rows = inv.active_schedule().unwrap().rows;
    inv.schedule_override = Some(rows);
    inv.loan.principal = Decimal::ZERO;

    assert_eq!(inv.borrowed_amount(), dec!(170_000));
    let m = calculate_financial_metrics(&inv).unwrap().result;
    assert_eq!(m.personal_contribution, dec!(36_500));
}
