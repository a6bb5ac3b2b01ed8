use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use serde::{Deserialize, Serialize};

use crate::capital_gains::allowances::holding_allowance;
use crate::error::ImmoFinanceError;
use crate::investment::LessorStatus;
use crate::policy::TaxPolicy;
use crate::types::{Money, Rate, TaxRegime};
use crate::ImmoFinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Inputs of a prospective sale under one regime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleInput {
    pub regime: TaxRegime,
    #[serde(default)]
    pub lessor_status: LessorStatus,
    pub purchase_year: i32,
    pub sale_year: i32,
    pub purchase_price: Money,
    #[serde(default)]
    pub notary_fees: Money,
    #[serde(default)]
    pub acquisition_agency_fees: Money,
    #[serde(default)]
    pub improvement_works: Money,
    #[serde(default)]
    pub appreciation_rate: Rate,
    #[serde(default)]
    pub sale_agency_fee_rate: Rate,
    #[serde(default)]
    pub marginal_rate: Rate,
    /// Depreciation actually deducted through the sale year
    #[serde(default)]
    pub cumulative_used_depreciation: Money,
    #[serde(default)]
    pub flat_acquisition_fees: bool,
    #[serde(default)]
    pub flat_works_allowance: bool,
}

/// Price side of a sale, independent of the tax regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GainBasis {
    pub holding_years: u32,
    pub projected_value: Money,
    pub sale_agency_fees: Money,
    pub net_selling_price: Money,
    pub corrected_acquisition_cost: Money,
    pub gross_capital_gain: Money,
}

/// Capital-gain taxation of one regime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalGainResult {
    pub regime: TaxRegime,
    pub holding_years: u32,
    pub gross_capital_gain: Money,
    pub income_tax_allowance: Rate,
    pub social_charges_allowance: Rate,
    pub taxable_capital_gain_ir: Money,
    pub taxable_capital_gain_ps: Money,
    pub income_tax: Money,
    pub social_charges: Money,
    /// Depreciation taxed back at the marginal rate (non-professional réel-BIC)
    pub depreciation_taxable: Money,
    pub depreciation_tax: Money,
    pub total_tax: Money,
    pub net_capital_gain: Money,
    /// Professional lessor only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short_term_gain: Option<Money>,
    /// Professional lessor only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_term_gain: Option<Money>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Gross gain and capital-gain tax of a single regime.
pub fn compute_sale(input: &SaleInput, policy: &TaxPolicy) -> ImmoFinanceResult<CapitalGainResult> {
    let basis = gain_basis(input, policy)?;
    Ok(tax_capital_gain(
        input.regime,
        input.lessor_status,
        basis.gross_capital_gain,
        basis.holding_years,
        input.marginal_rate,
        input.cumulative_used_depreciation,
        policy,
    ))
}

/// Projected price, corrected acquisition cost and gross gain.
pub fn gain_basis(input: &SaleInput, policy: &TaxPolicy) -> ImmoFinanceResult<GainBasis> {
    if input.sale_year <= input.purchase_year {
        return Err(ImmoFinanceError::configuration(
            "sale_year",
            format!(
                "Sale year {} must come after purchase year {}",
                input.sale_year, input.purchase_year
            ),
        ));
    }
    let holding_years = (input.sale_year - input.purchase_year) as u32;

    let projected_value = input.purchase_price
        * (Decimal::ONE + input.appreciation_rate)
            .checked_powu(u64::from(holding_years))
            .ok_or_else(|| ImmoFinanceError::InvalidInput {
                field: "appreciation_rate".into(),
                reason: "Projected value overflows".into(),
            })?;
    let sale_agency_fees = projected_value * input.sale_agency_fee_rate;
    let net_selling_price = projected_value - sale_agency_fees;

    let acquisition_fees = if input.flat_acquisition_fees {
        input.purchase_price * policy.flat_acquisition_fee_rate
    } else {
        input.notary_fees + input.acquisition_agency_fees
    };
    let works = if input.flat_works_allowance && holding_years > policy.flat_works_min_holding_years
    {
        input.purchase_price * policy.flat_works_rate
    } else {
        input.improvement_works
    };
    let corrected_acquisition_cost = input.purchase_price + acquisition_fees + works;

    Ok(GainBasis {
        holding_years,
        projected_value,
        sale_agency_fees,
        net_selling_price,
        corrected_acquisition_cost,
        gross_capital_gain: (net_selling_price - corrected_acquisition_cost).max(Decimal::ZERO),
    })
}

/// Tax a gross gain under `regime`.
///
/// Private-wealth regimes pay the proportional rate and social charges after
/// holding allowances. A non-professional réel-BIC lessor additionally pays
/// the marginal rate on the depreciation deducted, capped at the gain. A
/// professional lessor gets no allowance: the depreciation-backed part of
/// the gain is short-term (marginal rate), the rest long-term (flat rate
/// plus social charges), and a short holding makes everything short-term.
pub fn tax_capital_gain(
    regime: TaxRegime,
    lessor_status: LessorStatus,
    gross_gain: Money,
    holding_years: u32,
    marginal_rate: Rate,
    cumulative_used_depreciation: Money,
    policy: &TaxPolicy,
) -> CapitalGainResult {
    if regime == TaxRegime::ReelBic && lessor_status == LessorStatus::Professional {
        return tax_professional_gain(
            gross_gain,
            holding_years,
            marginal_rate,
            cumulative_used_depreciation,
            policy,
        );
    }

    let income_tax_allowance = holding_allowance(&policy.ir_allowance, holding_years);
    let social_charges_allowance = holding_allowance(&policy.ps_allowance, holding_years);
    let taxable_capital_gain_ir = gross_gain * (Decimal::ONE - income_tax_allowance);
    let taxable_capital_gain_ps = gross_gain * (Decimal::ONE - social_charges_allowance);
    let income_tax = taxable_capital_gain_ir * policy.capital_gain_income_tax_rate;
    let social_charges = taxable_capital_gain_ps * policy.capital_gain_social_rate;

    let (depreciation_taxable, depreciation_tax) = if regime == TaxRegime::ReelBic {
        let taxable = cumulative_used_depreciation.max(Decimal::ZERO).min(gross_gain);
        (taxable, taxable * marginal_rate)
    } else {
        (Decimal::ZERO, Decimal::ZERO)
    };

    let total_tax = income_tax + social_charges + depreciation_tax;
    CapitalGainResult {
        regime,
        holding_years,
        gross_capital_gain: gross_gain,
        income_tax_allowance,
        social_charges_allowance,
        taxable_capital_gain_ir,
        taxable_capital_gain_ps,
        income_tax,
        social_charges,
        depreciation_taxable,
        depreciation_tax,
        total_tax,
        net_capital_gain: gross_gain - total_tax,
        short_term_gain: None,
        long_term_gain: None,
    }
}

fn tax_professional_gain(
    gross_gain: Money,
    holding_years: u32,
    marginal_rate: Rate,
    cumulative_used_depreciation: Money,
    policy: &TaxPolicy,
) -> CapitalGainResult {
    let short_term_gain = if holding_years <= policy.professional_short_term_years {
        gross_gain
    } else {
        cumulative_used_depreciation.max(Decimal::ZERO).min(gross_gain)
    };
    let long_term_gain = gross_gain - short_term_gain;

    let income_tax =
        short_term_gain * marginal_rate + long_term_gain * policy.professional_long_term_rate;
    let social_charges = long_term_gain * policy.capital_gain_social_rate;
    let total_tax = income_tax + social_charges;

    CapitalGainResult {
        regime: TaxRegime::ReelBic,
        holding_years,
        gross_capital_gain: gross_gain,
        income_tax_allowance: Decimal::ZERO,
        social_charges_allowance: Decimal::ZERO,
        taxable_capital_gain_ir: gross_gain,
        taxable_capital_gain_ps: long_term_gain,
        income_tax,
        social_charges,
        depreciation_taxable: Decimal::ZERO,
        depreciation_tax: Decimal::ZERO,
        total_tax,
        net_capital_gain: gross_gain - total_tax,
        short_term_gain: Some(short_term_gain),
        long_term_gain: Some(long_term_gain),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
