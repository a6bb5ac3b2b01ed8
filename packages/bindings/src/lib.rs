use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use immo_finance_core::financing::amortization::LoanTerms;
use immo_finance_core::financing::import::ImportedSchedule;
use immo_finance_core::investment::Investment;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Serialize with every amount rounded for display.
fn to_rounded_json(output: &impl Serialize) -> NapiResult<String> {
    let mut value = serde_json::to_value(output).map_err(to_napi_error)?;
    immo_finance_core::round_presentation(&mut value);
    serde_json::to_string(&value).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Financing
// ---------------------------------------------------------------------------

#[napi]
pub fn generate_amortization_schedule(input_json: String) -> NapiResult<String> {
    let terms: LoanTerms = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = immo_finance_core::financing::generate_amortization_schedule(&terms)
        .map_err(to_napi_error)?;
    to_rounded_json(&output)
}

/// Returns the instalment as a decimal string; "0" for an unconfigured loan.
#[napi]
pub fn calculate_monthly_payment(input_json: String) -> NapiResult<String> {
    let terms: LoanTerms = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let payment = immo_finance_core::financing::calculate_monthly_payment(&terms)
        .map_err(to_napi_error)?;
    Ok(immo_finance_core::round_money(payment).to_string())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RateSource {
    Schedule(ImportedSchedule),
    Annuity {
        principal: Decimal,
        payment: Decimal,
        months: u32,
    },
}

/// Accepts either `{"rows": [...]}` or `{"principal", "payment", "months"}`.
#[napi]
pub fn infer_loan_rate(input_json: String) -> NapiResult<String> {
    let source: RateSource = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    match source {
        RateSource::Schedule(schedule) => {
            let output = immo_finance_core::financing::import::analyse_imported_schedule(&schedule)
                .map_err(to_napi_error)?;
            to_rounded_json(&output)
        }
        RateSource::Annuity {
            principal,
            payment,
            months,
        } => {
            let inference =
                immo_finance_core::financing::payment::solve_monthly_rate(principal, payment, months);
            to_rounded_json(&inference)
        }
    }
}

// ---------------------------------------------------------------------------
// Taxation, resale and project metrics
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_all_tax_regimes(input_json: String, year: i32) -> NapiResult<String> {
    let investment: Investment = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = immo_finance_core::taxation::calculate_all_tax_regimes(&investment, year)
        .map_err(to_napi_error)?;
    to_rounded_json(&output)
}

#[napi]
pub fn calculate_all_capital_gain_regimes(input_json: String) -> NapiResult<String> {
    let investment: Investment = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        immo_finance_core::capital_gains::calculate_all_capital_gain_regimes(&investment)
            .map_err(to_napi_error)?;
    to_rounded_json(&output)
}

#[napi]
pub fn calculate_financial_metrics(input_json: String) -> NapiResult<String> {
    let investment: Investment = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = immo_finance_core::metrics::calculate_financial_metrics(&investment)
        .map_err(to_napi_error)?;
    to_rounded_json(&output)
}
