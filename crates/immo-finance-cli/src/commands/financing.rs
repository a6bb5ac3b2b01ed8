use chrono::{Local, NaiveDate};
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;
use std::time::Instant;

use immo_finance_core::financing::amortization::{
    calculate_monthly_payment, generate_amortization_schedule, DeferralKind, LoanTerms,
};
use immo_finance_core::financing::import::{analyse_imported_schedule, ImportedSchedule};
use immo_finance_core::financing::payment::solve_monthly_rate;
use immo_finance_core::with_metadata;

use crate::input;

/// Arguments for schedule generation
#[derive(Args)]
pub struct AmortizationArgs {
    /// Path to JSON loan terms
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_amortization(args: AmortizationArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: LoanTerms = input::read_input(args.input.as_deref(), "loan terms")?;
    let result = generate_amortization_schedule(&terms)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the monthly instalment
#[derive(Args)]
pub struct PaymentArgs {
    /// Path to JSON loan terms (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Amount borrowed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Nominal annual rate as a decimal (0.035 = 3.5%)
    #[arg(long)]
    pub annual_rate: Option<Decimal>,

    /// Loan term in years
    #[arg(long)]
    pub term_years: Option<u32>,

    /// Deferral kind: none, partial or total
    #[arg(long, default_value = "none")]
    pub deferral_kind: String,

    /// Deferral length in months
    #[arg(long, default_value_t = 0)]
    pub deferral_months: u32,

    /// Disbursement date (defaults to today)
    #[arg(long)]
    pub start_date: Option<NaiveDate>,
}

pub fn run_payment(args: PaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let terms: LoanTerms = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        let deferral_kind: DeferralKind =
            serde_json::from_value(Value::String(args.deferral_kind.to_lowercase()))
                .map_err(|_| format!("unknown deferral kind '{}'", args.deferral_kind))?;
        LoanTerms {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate: args
                .annual_rate
                .ok_or("--annual-rate is required (or provide --input)")?,
            term_years: args
                .term_years
                .ok_or("--term-years is required (or provide --input)")?,
            deferral_kind,
            deferral_months: args.deferral_months,
            start_date: args.start_date.unwrap_or_else(|| Local::now().date_naive()),
            monthly_insurance: Decimal::ZERO,
        }
    };

    let payment = calculate_monthly_payment(&terms)?;
    let mut warnings = Vec::new();
    if payment.is_zero() {
        warnings.push("Loan principal, rate or term is not set".to_string());
    }
    let result = with_metadata(
        "Fixed-rate annuity instalment",
        &terms,
        warnings,
        start.elapsed().as_micros() as u64,
        serde_json::json!({
            "monthly_payment": payment.to_string(),
            "total_months": terms.total_months(),
            "deferral_months": terms.effective_deferral_months(),
        }),
    );
    Ok(serde_json::to_value(result)?)
}

/// Arguments for rate inference
#[derive(Args)]
pub struct InferRateArgs {
    /// Path to a JSON imported schedule (`{"rows": [...]}`)
    #[arg(long)]
    pub input: Option<String>,

    /// Opening balance of the repayment period
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Regular monthly instalment
    #[arg(long)]
    pub payment: Option<Decimal>,

    /// Number of instalments
    #[arg(long)]
    pub months: Option<u32>,
}

pub fn run_infer_rate(args: InferRateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    if let (Some(principal), Some(payment), Some(months)) =
        (args.principal, args.payment, args.months)
    {
        let start = Instant::now();
        let inference = solve_monthly_rate(principal, payment, months);
        let warnings = if inference.converged {
            Vec::new()
        } else {
            vec!["Rate could not be inferred; reported as unknown (0)".to_string()]
        };
        let result = with_metadata(
            "Newton-Raphson inversion of the annuity formula",
            &serde_json::json!({
                "principal": principal.to_string(),
                "payment": payment.to_string(),
                "months": months,
            }),
            warnings,
            start.elapsed().as_micros() as u64,
            inference,
        );
        return Ok(serde_json::to_value(result)?);
    }

    let schedule: ImportedSchedule =
        input::read_input(args.input.as_deref(), "an imported schedule")?;
    let result = analyse_imported_schedule(&schedule)?;
    Ok(serde_json::to_value(result)?)
}
