//! Jurisdiction constants used by the tax and capital-gain engines.
//!
//! Every figure is a policy parameter rather than engine logic, so it lives
//! in a serde struct with per-field defaults. Callers embed it in the
//! investment input or load an override from a TOML file.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ImmoFinanceError;
use crate::types::{Money, Rate};
use crate::ImmoFinanceResult;

/// Holding-period allowance schedule for one tax component.
///
/// The allowance is zero up to `grace_years`, then grows by `annual_rate`
/// per year through `standard_until_year`. Later years accrue
/// `late_annual_rate`, except `bonus_year` which accrues the one-off
/// `bonus_rate` instead. From `full_exemption_year` the gain is fully exempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllowanceSchedule {
    pub grace_years: u32,
    pub annual_rate: Rate,
    pub standard_until_year: u32,
    #[serde(default)]
    pub bonus_year: Option<u32>,
    #[serde(default)]
    pub bonus_rate: Rate,
    #[serde(default)]
    pub late_annual_rate: Rate,
    pub full_exemption_year: u32,
}

fn default_ir_allowance() -> AllowanceSchedule {
    AllowanceSchedule {
        grace_years: 5,
        annual_rate: dec!(0.06),
        standard_until_year: 21,
        bonus_year: None,
        bonus_rate: Decimal::ZERO,
        late_annual_rate: Decimal::ZERO,
        full_exemption_year: 22,
    }
}

fn default_ps_allowance() -> AllowanceSchedule {
    AllowanceSchedule {
        grace_years: 5,
        annual_rate: dec!(0.0165),
        standard_until_year: 21,
        bonus_year: Some(22),
        bonus_rate: dec!(0.016),
        late_annual_rate: dec!(0.09),
        full_exemption_year: 30,
    }
}

fn default_micro_foncier_allowance() -> Rate {
    dec!(0.30)
}

fn default_micro_bic_allowance() -> Rate {
    dec!(0.50)
}

fn default_social_charges_rate() -> Rate {
    dec!(0.172)
}

fn default_capital_gain_income_tax_rate() -> Rate {
    dec!(0.19)
}

fn default_professional_long_term_rate() -> Rate {
    dec!(0.128)
}

fn default_professional_short_term_years() -> u32 {
    2
}

fn default_foncier_deficit_ceiling() -> Money {
    dec!(10700)
}

fn default_micro_foncier_threshold() -> Money {
    dec!(15000)
}

fn default_micro_bic_threshold() -> Money {
    dec!(77700)
}

fn default_flat_acquisition_fee_rate() -> Rate {
    dec!(0.075)
}

fn default_flat_works_rate() -> Rate {
    dec!(0.15)
}

fn default_flat_works_min_holding_years() -> u32 {
    5
}

fn default_penalty_rate_cap() -> Rate {
    dec!(0.03)
}

fn default_penalty_months() -> u32 {
    6
}

/// Tax and lending policy constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxPolicy {
    /// Flat allowance of the micro-foncier regime
    #[serde(default = "default_micro_foncier_allowance")]
    pub micro_foncier_allowance: Rate,
    /// Flat allowance of the micro-BIC regime
    #[serde(default = "default_micro_bic_allowance")]
    pub micro_bic_allowance: Rate,
    /// Social charges on rental income
    #[serde(default = "default_social_charges_rate")]
    pub social_charges_rate: Rate,
    /// Proportional income tax on private capital gains
    #[serde(default = "default_capital_gain_income_tax_rate")]
    pub capital_gain_income_tax_rate: Rate,
    /// Social charges on capital gains
    #[serde(default = "default_social_charges_rate")]
    pub capital_gain_social_rate: Rate,
    /// Flat rate on professional long-term gains (social charges on top)
    #[serde(default = "default_professional_long_term_rate")]
    pub professional_long_term_rate: Rate,
    /// Holding years up to which a professional gain is entirely short-term
    #[serde(default = "default_professional_short_term_years")]
    pub professional_short_term_years: u32,
    /// Share of a foncier deficit deductible from global income each year
    #[serde(default = "default_foncier_deficit_ceiling")]
    pub foncier_deficit_ceiling: Money,
    #[serde(default = "default_micro_foncier_threshold")]
    pub micro_foncier_threshold: Money,
    #[serde(default = "default_micro_bic_threshold")]
    pub micro_bic_threshold: Money,
    /// Flat acquisition fees as a share of the purchase price
    #[serde(default = "default_flat_acquisition_fee_rate")]
    pub flat_acquisition_fee_rate: Rate,
    /// Flat works allowance as a share of the purchase price
    #[serde(default = "default_flat_works_rate")]
    pub flat_works_rate: Rate,
    /// Holding years that must be exceeded before the flat works allowance applies
    #[serde(default = "default_flat_works_min_holding_years")]
    pub flat_works_min_holding_years: u32,
    /// Early-repayment penalty cap as a share of the outstanding balance
    #[serde(default = "default_penalty_rate_cap")]
    pub early_repayment_penalty_rate_cap: Rate,
    /// Early-repayment penalty cap in months of interest
    #[serde(default = "default_penalty_months")]
    pub early_repayment_penalty_months: u32,
    #[serde(default = "default_ir_allowance")]
    pub ir_allowance: AllowanceSchedule,
    #[serde(default = "default_ps_allowance")]
    pub ps_allowance: AllowanceSchedule,
}

impl Default for TaxPolicy {
    fn default() -> Self {
        TaxPolicy {
            micro_foncier_allowance: default_micro_foncier_allowance(),
            micro_bic_allowance: default_micro_bic_allowance(),
            social_charges_rate: default_social_charges_rate(),
            capital_gain_income_tax_rate: default_capital_gain_income_tax_rate(),
            capital_gain_social_rate: default_social_charges_rate(),
            professional_long_term_rate: default_professional_long_term_rate(),
            professional_short_term_years: default_professional_short_term_years(),
            foncier_deficit_ceiling: default_foncier_deficit_ceiling(),
            micro_foncier_threshold: default_micro_foncier_threshold(),
            micro_bic_threshold: default_micro_bic_threshold(),
            flat_acquisition_fee_rate: default_flat_acquisition_fee_rate(),
            flat_works_rate: default_flat_works_rate(),
            flat_works_min_holding_years: default_flat_works_min_holding_years(),
            early_repayment_penalty_rate_cap: default_penalty_rate_cap(),
            early_repayment_penalty_months: default_penalty_months(),
            ir_allowance: default_ir_allowance(),
            ps_allowance: default_ps_allowance(),
        }
    }
}

impl TaxPolicy {
    /// Parse a policy from TOML. Missing keys keep their defaults.
    pub fn from_toml_str(contents: &str) -> ImmoFinanceResult<Self> {
        let policy: TaxPolicy = toml::from_str(contents)?;
        policy.validate()?;
        Ok(policy)
    }

    /// Load a policy override file.
    pub fn load(path: &Path) -> ImmoFinanceResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ImmoFinanceError::Policy(format!("cannot read '{}': {e}", path.display()))
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> ImmoFinanceResult<()> {
        let rates = [
            ("micro_foncier_allowance", self.micro_foncier_allowance),
            ("micro_bic_allowance", self.micro_bic_allowance),
            ("social_charges_rate", self.social_charges_rate),
            ("capital_gain_income_tax_rate", self.capital_gain_income_tax_rate),
            ("capital_gain_social_rate", self.capital_gain_social_rate),
            ("professional_long_term_rate", self.professional_long_term_rate),
            ("flat_acquisition_fee_rate", self.flat_acquisition_fee_rate),
            ("flat_works_rate", self.flat_works_rate),
            (
                "early_repayment_penalty_rate_cap",
                self.early_repayment_penalty_rate_cap,
            ),
        ];
        for (field, rate) in rates {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(ImmoFinanceError::Policy(format!(
                    "{field} must be between 0 and 1, got {rate}"
                )));
            }
        }
        let schedules = [
            ("ir_allowance", &self.ir_allowance),
            ("ps_allowance", &self.ps_allowance),
        ];
        for (field, schedule) in schedules {
            if schedule.full_exemption_year <= schedule.grace_years {
                return Err(ImmoFinanceError::Policy(format!(
                    "{field}: full exemption must come after the grace period"
                )));
            }
        }
        if self.foncier_deficit_ceiling < Decimal::ZERO {
            return Err(ImmoFinanceError::Policy(
                "foncier_deficit_ceiling must not be negative".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let policy = TaxPolicy::from_toml_str("").unwrap();
        assert_eq!(policy, TaxPolicy::default());
    }

    #[test]
    fn test_partial_override() {
        let policy = TaxPolicy::from_toml_str(
            r#"
            micro_bic_allowance = "0.71"
            foncier_deficit_ceiling = "21400"
            "#,
        )
        .unwrap();
        assert_eq!(policy.micro_bic_allowance, dec!(0.71));
        assert_eq!(policy.foncier_deficit_ceiling, dec!(21400));
        assert_eq!(policy.micro_foncier_allowance, dec!(0.30));
    }

    #[test]
    fn test_rejects_rate_above_one() {
        let err = TaxPolicy::from_toml_str(r#"social_charges_rate = "17.2""#).unwrap_err();
        assert!(matches!(err, ImmoFinanceError::Policy(_)));
    }
}
