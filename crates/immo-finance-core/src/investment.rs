use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::error::ImmoFinanceError;
use crate::financing::amortization::{
    build_schedule, AmortizationRow, AmortizationSchedule, EarlyRepaymentPenalty, LoanTerms,
};
use crate::financing::import::infer_rate_from_schedule;
use crate::policy::TaxPolicy;
use crate::taxation::depreciation::DepreciationPriority;
use crate::types::{Money, Rate};
use crate::ImmoFinanceResult;

/// Costs paid at acquisition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurchaseCosts {
    pub purchase_price: Money,
    #[serde(default)]
    pub notary_fees: Money,
    #[serde(default)]
    pub acquisition_agency_fees: Money,
    /// Capital works not deducted as running expenses
    #[serde(default)]
    pub improvement_works: Money,
    /// Application and guarantee fees of the loan
    #[serde(default)]
    pub loan_fees: Money,
    #[serde(default)]
    pub furniture_cost: Money,
}

impl PurchaseCosts {
    pub fn total(&self) -> Money {
        self.purchase_price
            + self.notary_fees
            + self.acquisition_agency_fees
            + self.improvement_works
            + self.loan_fees
            + self.furniture_cost
    }
}

/// Income and charges of one calendar year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearlyExpenses {
    pub year: i32,
    /// Unfurnished rent
    #[serde(default)]
    pub rent: Money,
    #[serde(default)]
    pub furnished_rent: Money,
    /// Charges paid by the owner and recovered from the tenant
    #[serde(default)]
    pub recharged_charges: Money,
    #[serde(default)]
    pub property_tax: Money,
    #[serde(default)]
    pub condo_fees: Money,
    #[serde(default)]
    pub insurance: Money,
    #[serde(default)]
    pub management_fees: Money,
    #[serde(default)]
    pub unpaid_rent_insurance: Money,
    #[serde(default)]
    pub repairs: Money,
    #[serde(default)]
    pub other_deductible: Money,
    #[serde(default)]
    pub other_non_deductible: Money,
}

impl YearlyExpenses {
    pub fn empty(year: i32) -> Self {
        YearlyExpenses {
            year,
            ..YearlyExpenses::default()
        }
    }

    /// Charges deductible under the real regimes, loan costs excluded.
    pub fn deductible_charges(&self) -> Money {
        self.property_tax
            + self.condo_fees
            + self.insurance
            + self.management_fees
            + self.unpaid_rent_insurance
            + self.repairs
            + self.other_deductible
    }

    /// Every cash charge of the year, loan costs excluded.
    pub fn operating_charges(&self) -> Money {
        self.deductible_charges() + self.other_non_deductible
    }

    /// Cash received under a bare or furnished letting.
    pub fn receipts(&self, furnished: bool) -> Money {
        let rent = if furnished { self.furnished_rent } else { self.rent };
        rent + self.recharged_charges
    }
}

/// Caller-editable tax settings. Unset optional values fall back to the policy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaxParameters {
    #[serde(default)]
    pub marginal_rate: Option<Rate>,
    #[serde(default)]
    pub social_charges_rate: Option<Rate>,
    #[serde(default)]
    pub building_value: Money,
    #[serde(default)]
    pub building_amortization_years: u32,
    #[serde(default)]
    pub furniture_value: Money,
    #[serde(default)]
    pub furniture_amortization_years: u32,
    /// Foncier deficit brought into the first project year
    #[serde(default)]
    pub carried_forward_deficit: Money,
    #[serde(default)]
    pub deficit_ceiling: Option<Money>,
    #[serde(default)]
    pub micro_foncier_allowance: Option<Rate>,
    #[serde(default)]
    pub micro_bic_allowance: Option<Rate>,
    #[serde(default)]
    pub depreciation_priority: DepreciationPriority,
}

impl TaxParameters {
    pub fn marginal_rate_or_zero(&self) -> Rate {
        self.marginal_rate.unwrap_or(Decimal::ZERO)
    }

    pub fn social_charges_rate(&self, policy: &TaxPolicy) -> Rate {
        self.social_charges_rate.unwrap_or(policy.social_charges_rate)
    }

    pub fn deficit_ceiling(&self, policy: &TaxPolicy) -> Money {
        self.deficit_ceiling.unwrap_or(policy.foncier_deficit_ceiling)
    }

    pub fn micro_foncier_allowance(&self, policy: &TaxPolicy) -> Rate {
        self.micro_foncier_allowance
            .unwrap_or(policy.micro_foncier_allowance)
    }

    pub fn micro_bic_allowance(&self, policy: &TaxPolicy) -> Rate {
        self.micro_bic_allowance.unwrap_or(policy.micro_bic_allowance)
    }
}

/// Furnished-letting status, which changes how a réel-BIC gain is taxed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessorStatus {
    /// LMNP
    #[default]
    NonProfessional,
    /// LMP
    Professional,
}

/// Resale assumptions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleParameters {
    /// Annual appreciation of the purchase price
    #[serde(default)]
    pub appreciation_rate: Rate,
    /// Agency fee on the projected sale price
    #[serde(default)]
    pub sale_agency_fee_rate: Rate,
    #[serde(default)]
    pub lessor_status: LessorStatus,
    /// Replace actual acquisition fees with the flat allowance
    #[serde(default)]
    pub flat_acquisition_fees: bool,
    /// Replace actual works with the flat allowance once eligible
    #[serde(default)]
    pub flat_works_allowance: bool,
    #[serde(default)]
    pub early_repayment_penalty: EarlyRepaymentPenalty,
}

/// Everything the engine needs about one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investment {
    #[serde(default)]
    pub name: String,
    pub purchase: PurchaseCosts,
    pub loan: LoanTerms,
    /// Lender-supplied schedule replacing the generated one wholesale
    #[serde(default)]
    pub schedule_override: Option<Vec<AmortizationRow>>,
    #[serde(default)]
    pub project_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub project_end_date: Option<NaiveDate>,
    #[serde(default)]
    pub expenses: Vec<YearlyExpenses>,
    #[serde(default)]
    pub tax: TaxParameters,
    #[serde(default)]
    pub sale: SaleParameters,
    #[serde(default)]
    pub policy: TaxPolicy,
}

impl Investment {
    /// The override when present, otherwise the generated schedule.
    pub fn active_schedule(&self) -> ImmoFinanceResult<AmortizationSchedule> {
        match &self.schedule_override {
            Some(rows) => Ok(AmortizationSchedule::from_rows(rows.clone())),
            None => build_schedule(&self.loan),
        }
    }

    /// Nominal annual loan rate, inferred from the override when one is active.
    ///
    /// Returns zero when an imported schedule does not yield a rate.
    pub fn loan_annual_rate(&self) -> Rate {
        match &self.schedule_override {
            Some(rows) if self.loan.annual_rate.is_zero() => infer_rate_from_schedule(rows).annual_rate,
            _ => self.loan.annual_rate,
        }
    }

    /// Amount borrowed, read from the first imported row when the loan
    /// terms leave it unset.
    pub fn borrowed_amount(&self) -> Money {
        match &self.schedule_override {
            Some(rows) if self.loan.principal.is_zero() => rows
                .first()
                .map(|r| r.balance_outstanding)
                .unwrap_or_default(),
            _ => self.loan.principal,
        }
    }

    pub fn expenses_for(&self, year: i32) -> Option<&YearlyExpenses> {
        self.expenses.iter().find(|e| e.year == year)
    }

    /// First year of the tax timeline.
    pub fn first_year(&self) -> i32 {
        self.project_start_date
            .unwrap_or(self.loan.start_date)
            .year()
    }

    /// Calendar years from purchase to sale, both inclusive.
    pub fn project_years(&self) -> ImmoFinanceResult<RangeInclusive<i32>> {
        let start = self.project_start_date.ok_or_else(|| {
            ImmoFinanceError::configuration("project_start_date", "Project start date is not set")
        })?;
        let end = self.project_end_date.ok_or_else(|| {
            ImmoFinanceError::configuration("project_end_date", "Project end date is not set")
        })?;
        if end.year() <= start.year() {
            return Err(ImmoFinanceError::configuration(
                "project_end_date",
                format!(
                    "Sale year {} must come after purchase year {}",
                    end.year(),
                    start.year()
                ),
            ));
        }
        Ok(start.year()..=end.year())
    }

    pub fn validate(&self) -> ImmoFinanceResult<()> {
        if self.purchase.purchase_price < Decimal::ZERO {
            return Err(ImmoFinanceError::InvalidInput {
                field: "purchase.purchase_price".into(),
                reason: "Purchase price cannot be negative".into(),
            });
        }
        if let Some(rate) = self.tax.marginal_rate {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(ImmoFinanceError::InvalidInput {
                    field: "tax.marginal_rate".into(),
                    reason: "Marginal rate must be between 0 and 1".into(),
                });
            }
        }
        if self.sale.sale_agency_fee_rate < Decimal::ZERO
            || self.sale.sale_agency_fee_rate >= Decimal::ONE
        {
            return Err(ImmoFinanceError::InvalidInput {
                field: "sale.sale_agency_fee_rate".into(),
                reason: "Agency fee rate must be in [0, 1)".into(),
            });
        }
        if self.sale.appreciation_rate <= -Decimal::ONE {
            return Err(ImmoFinanceError::InvalidInput {
                field: "sale.appreciation_rate".into(),
                reason: "Appreciation must be greater than -100%".into(),
            });
        }
        self.policy.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn loan() -> LoanTerms {
        LoanTerms {
            principal: dec!(100000),
            annual_rate: dec!(0.036),
            term_years: 15,
            deferral_kind: Default::default(),
            deferral_months: 0,
            start_date: NaiveDate::from_ymd_opt(2022, 3, 1).unwrap(),
            monthly_insurance: Decimal::ZERO,
        }
    }

    fn investment() -> Investment {
        Investment {
            name: "Studio".into(),
            purchase: PurchaseCosts {
                purchase_price: dec!(120000),
                notary_fees: dec!(9000),
                ..Default::default()
            },
            loan: loan(),
            schedule_override: None,
            project_start_date: NaiveDate::from_ymd_opt(2022, 3, 1),
            project_end_date: NaiveDate::from_ymd_opt(2032, 3, 1),
            expenses: vec![],
            tax: TaxParameters::default(),
            sale: SaleParameters::default(),
            policy: TaxPolicy::default(),
        }
    }

    #[test]
    fn test_project_years() {
        assert_eq!(investment().project_years().unwrap(), 2022..=2032);
    }

    #[test]
    fn test_same_year_sale_is_configuration_error() {
        let mut inv = investment();
        inv.project_end_date = NaiveDate::from_ymd_opt(2022, 12, 1);
        assert!(matches!(
            inv.project_years().unwrap_err(),
            ImmoFinanceError::Configuration { .. }
        ));
        inv.project_end_date = None;
        assert!(inv.project_years().is_err());
    }

    #[test]
    fn test_override_replaces_schedule_and_supplies_rate() {
        let mut inv = investment();
        let generated = build_schedule(&inv.loan).unwrap().rounded();
        inv.schedule_override = Some(generated.rows.clone());
        inv.loan.annual_rate = Decimal::ZERO;
        assert_eq!(inv.active_schedule().unwrap().rows, generated.rows);
        assert!((inv.loan_annual_rate() - dec!(0.036)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_receipts_include_recharged_charges() {
        let e = YearlyExpenses {
            year: 2024,
            rent: dec!(9000),
            furnished_rent: dec!(10200),
            recharged_charges: dec!(600),
            ..Default::default()
        };
        assert_eq!(e.receipts(false), dec!(9600));
        assert_eq!(e.receipts(true), dec!(10800));
    }
}
