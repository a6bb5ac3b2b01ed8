use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::ImmoFinanceError;
use crate::financing::payment::{compound_factor, monthly_payment};
use crate::policy::TaxPolicy;
use crate::types::{round_money, with_metadata, ComputationOutput, Money, Rate};
use crate::ImmoFinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Opening period during which principal repayment is suspended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeferralKind {
    #[default]
    None,
    /// Interest is paid, principal is not
    Partial,
    /// Nothing is paid, interest capitalises monthly
    Total,
}

/// Loan parameters. Zero principal, rate or term means "not yet configured".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanTerms {
    #[serde(default)]
    pub principal: Money,
    /// Nominal annual rate (0.03 = 3%)
    #[serde(default)]
    pub annual_rate: Rate,
    #[serde(default)]
    pub term_years: u32,
    #[serde(default)]
    pub deferral_kind: DeferralKind,
    /// Length of the deferral window, counted inside the term
    #[serde(default)]
    pub deferral_months: u32,
    /// Disbursement date; the first instalment falls one month later
    pub start_date: NaiveDate,
    /// Borrower insurance charged every month of the term
    #[serde(default)]
    pub monthly_insurance: Money,
}

impl LoanTerms {
    pub fn monthly_rate(&self) -> Rate {
        self.annual_rate / dec!(12)
    }

    pub fn total_months(&self) -> u32 {
        self.term_years * 12
    }

    pub fn is_configured(&self) -> bool {
        self.principal > Decimal::ZERO && self.annual_rate > Decimal::ZERO && self.term_years > 0
    }

    /// Deferral months that actually apply (none when the kind is `None`).
    pub fn effective_deferral_months(&self) -> u32 {
        match self.deferral_kind {
            DeferralKind::None => 0,
            DeferralKind::Partial | DeferralKind::Total => self.deferral_months,
        }
    }
}

/// One month of the repayment plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationRow {
    /// 1-based month index
    pub month: u32,
    pub date: NaiveDate,
    /// Principal before this instalment (excludes interest capitalised during a deferral)
    pub principal_outstanding: Money,
    /// Balance before this instalment, including capitalised interest
    pub balance_outstanding: Money,
    pub interest: Money,
    /// Instalment excluding insurance
    pub payment: Money,
    pub principal_paid: Money,
    #[serde(default)]
    pub insurance: Money,
    /// Sum of instalments through this month
    pub cumulative_paid: Money,
    /// Balance after this instalment; derived on import when absent
    #[serde(default)]
    pub remaining_balance: Money,
    #[serde(default)]
    pub is_deferred: bool,
}

impl AmortizationRow {
    pub fn rounded(&self) -> Self {
        AmortizationRow {
            principal_outstanding: round_money(self.principal_outstanding),
            balance_outstanding: round_money(self.balance_outstanding),
            interest: round_money(self.interest),
            payment: round_money(self.payment),
            principal_paid: round_money(self.principal_paid),
            insurance: round_money(self.insurance),
            cumulative_paid: round_money(self.cumulative_paid),
            remaining_balance: round_money(self.remaining_balance),
            ..self.clone()
        }
    }

    /// Balance left once this month is settled, from the opening figures.
    pub fn closing_balance(&self) -> Money {
        if self.is_deferred && self.payment.is_zero() {
            self.balance_outstanding + self.interest
        } else {
            self.balance_outstanding - self.principal_paid
        }
    }
}

/// A full repayment plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub rows: Vec<AmortizationRow>,
    /// Interest capitalised during a total deferral
    pub deferred_interest_total: Money,
    /// Regular instalment once the deferral window is over
    pub monthly_payment: Money,
    pub total_interest: Money,
    pub total_insurance: Money,
    pub total_paid: Money,
}

impl AmortizationSchedule {
    /// Assemble the totals for an externally supplied row sequence.
    ///
    /// Rows imported without closing balances get them derived from the
    /// opening balance; a supplied column is kept verbatim.
    pub fn from_rows(mut rows: Vec<AmortizationRow>) -> Self {
        if rows.iter().all(|r| r.remaining_balance.is_zero()) {
            for row in rows.iter_mut() {
                row.remaining_balance = row.closing_balance();
            }
        }
        let deferred_interest_total = rows
            .iter()
            .filter(|r| r.is_deferred && r.payment.is_zero())
            .map(|r| r.interest)
            .sum();
        let monthly_payment = rows
            .iter()
            .find(|r| !r.is_deferred)
            .map(|r| r.payment)
            .unwrap_or_default();
        let total_interest = rows.iter().map(|r| r.interest).sum();
        let total_insurance = rows.iter().map(|r| r.insurance).sum();
        let total_paid = rows.iter().map(|r| r.payment).sum();
        AmortizationSchedule {
            rows,
            deferred_interest_total,
            monthly_payment,
            total_interest,
            total_insurance,
            total_paid,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Copy with every amount rounded to cents, for display and persistence.
    pub fn rounded(&self) -> Self {
        AmortizationSchedule {
            rows: self.rows.iter().map(AmortizationRow::rounded).collect(),
            deferred_interest_total: round_money(self.deferred_interest_total),
            monthly_payment: round_money(self.monthly_payment),
            total_interest: round_money(self.total_interest),
            total_insurance: round_money(self.total_insurance),
            total_paid: round_money(self.total_paid),
        }
    }

    /// Loan flows falling in a calendar year.
    pub fn year_totals(&self, year: i32) -> LoanYear {
        let mut totals = LoanYear {
            year,
            ..LoanYear::default()
        };
        for row in self.rows.iter().filter(|r| r.date.year() == year) {
            totals.payments += row.payment;
            totals.interest += row.interest;
            totals.insurance += row.insurance;
            totals.principal_repaid += row.principal_paid;
        }
        totals
    }

    /// Outstanding balance once the last instalment of `year` is paid.
    ///
    /// Before the first instalment the opening balance is returned; an empty
    /// schedule has nothing outstanding.
    pub fn balance_at_year_end(&self, year: i32) -> Money {
        match self.rows.iter().rev().find(|r| r.date.year() <= year) {
            Some(row) => row.remaining_balance,
            None => self
                .rows
                .first()
                .map(|r| r.balance_outstanding)
                .unwrap_or_default(),
        }
    }
}

/// Loan flows aggregated over one calendar year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanYear {
    pub year: i32,
    pub payments: Money,
    pub interest: Money,
    pub insurance: Money,
    pub principal_repaid: Money,
}

/// Penalty charged when the loan is repaid at sale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EarlyRepaymentPenalty {
    None,
    /// Lesser of six months of interest and 3% of the outstanding balance
    #[default]
    Statutory,
    Fixed { amount: Money },
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Generate the monthly repayment plan, wrapped with metadata.
///
/// An unconfigured loan (zero principal, rate or term) yields an empty
/// schedule and a warning. A deferral that swallows the whole term is a
/// configuration error.
pub fn generate_amortization_schedule(
    terms: &LoanTerms,
) -> ImmoFinanceResult<ComputationOutput<AmortizationSchedule>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let schedule = build_schedule(terms)?;
    if schedule.is_empty() {
        warnings.push("Loan principal, rate or term is not set — schedule is empty".into());
    }
    if terms.deferral_kind == DeferralKind::None && terms.deferral_months > 0 {
        warnings.push(format!(
            "deferral_months = {} ignored because deferral_kind is none",
            terms.deferral_months
        ));
    }

    let methodology = match terms.deferral_kind {
        DeferralKind::None => "Fixed-rate annuity amortization",
        DeferralKind::Partial => "Fixed-rate annuity with interest-only deferral",
        DeferralKind::Total => "Fixed-rate annuity with capitalising deferral",
    };

    Ok(with_metadata(
        methodology,
        terms,
        warnings,
        start.elapsed().as_micros() as u64,
        schedule,
    ))
}

/// Regular post-deferral instalment, or zero when the loan is not configured.
pub fn calculate_monthly_payment(terms: &LoanTerms) -> ImmoFinanceResult<Money> {
    validate_terms(terms)?;
    if !terms.is_configured() {
        return Ok(Decimal::ZERO);
    }

    let rate = terms.monthly_rate();
    let deferral = terms.effective_deferral_months();
    let principal = match terms.deferral_kind {
        DeferralKind::Total => terms.principal * compound_factor(rate, deferral)?,
        DeferralKind::None | DeferralKind::Partial => terms.principal,
    };
    monthly_payment(principal, rate, terms.total_months() - deferral)
}

/// Build the full-precision schedule. Amounts are not rounded.
pub fn build_schedule(terms: &LoanTerms) -> ImmoFinanceResult<AmortizationSchedule> {
    validate_terms(terms)?;
    if !terms.is_configured() {
        tracing::debug!("loan not configured, returning empty schedule");
        return Ok(AmortizationSchedule::default());
    }

    let rate = terms.monthly_rate();
    let total_months = terms.total_months();
    let deferral = terms.effective_deferral_months();

    let mut rows: Vec<AmortizationRow> = Vec::with_capacity(total_months as usize);
    let mut balance = terms.principal;
    let mut cumulative = Decimal::ZERO;
    let mut deferred_interest_total = Decimal::ZERO;

    // --- Deferral window ---
    for month in 1..=deferral {
        let interest = balance * rate;
        let (payment, remaining) = match terms.deferral_kind {
            DeferralKind::Total => {
                deferred_interest_total += interest;
                (Decimal::ZERO, balance + interest)
            }
            _ => (interest, balance),
        };
        cumulative += payment;
        rows.push(AmortizationRow {
            month,
            date: instalment_date(terms.start_date, month)?,
            principal_outstanding: terms.principal,
            balance_outstanding: balance,
            interest,
            payment,
            principal_paid: Decimal::ZERO,
            insurance: terms.monthly_insurance,
            cumulative_paid: cumulative,
            remaining_balance: remaining,
            is_deferred: true,
        });
        balance = remaining;
    }

    // --- Repayment period on the (possibly inflated) balance ---
    let repayment_months = total_months - deferral;
    let instalment = monthly_payment(balance, rate, repayment_months)?;

    for offset in 1..=repayment_months {
        let month = deferral + offset;
        let interest = balance * rate;
        let principal_paid = if offset == repayment_months {
            balance
        } else {
            instalment - interest
        };
        let payment = interest + principal_paid;
        cumulative += payment;
        rows.push(AmortizationRow {
            month,
            date: instalment_date(terms.start_date, month)?,
            principal_outstanding: balance,
            balance_outstanding: balance,
            interest,
            payment,
            principal_paid,
            insurance: terms.monthly_insurance,
            cumulative_paid: cumulative,
            remaining_balance: balance - principal_paid,
            is_deferred: false,
        });
        balance -= principal_paid;
    }

    tracing::debug!(
        months = rows.len(),
        deferral,
        %instalment,
        %deferred_interest_total,
        "amortization schedule generated"
    );

    let total_interest = rows.iter().map(|r| r.interest).sum();
    let total_insurance = terms.monthly_insurance * Decimal::from(total_months);

    Ok(AmortizationSchedule {
        rows,
        deferred_interest_total,
        monthly_payment: instalment,
        total_interest,
        total_insurance,
        total_paid: cumulative,
    })
}

/// Penalty due when the outstanding balance is repaid early.
pub fn early_repayment_penalty(
    rule: &EarlyRepaymentPenalty,
    outstanding: Money,
    annual_rate: Rate,
    policy: &TaxPolicy,
) -> Money {
    if outstanding <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    match rule {
        EarlyRepaymentPenalty::None => Decimal::ZERO,
        EarlyRepaymentPenalty::Fixed { amount } => *amount,
        EarlyRepaymentPenalty::Statutory => {
            let interest_cap = outstanding * annual_rate / dec!(12)
                * Decimal::from(policy.early_repayment_penalty_months);
            let balance_cap = outstanding * policy.early_repayment_penalty_rate_cap;
            interest_cap.min(balance_cap)
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_terms(terms: &LoanTerms) -> ImmoFinanceResult<()> {
    if terms.principal < Decimal::ZERO {
        return Err(ImmoFinanceError::configuration(
            "principal",
            "Loan principal cannot be negative",
        ));
    }
    if terms.annual_rate < Decimal::ZERO {
        return Err(ImmoFinanceError::configuration(
            "annual_rate",
            "Loan rate cannot be negative",
        ));
    }
    if terms.monthly_insurance < Decimal::ZERO {
        return Err(ImmoFinanceError::InvalidInput {
            field: "monthly_insurance".into(),
            reason: "Insurance premium cannot be negative".into(),
        });
    }
    if terms.term_years > 0 && terms.effective_deferral_months() >= terms.total_months() {
        return Err(ImmoFinanceError::configuration(
            "deferral_months",
            format!(
                "Deferral of {} months leaves no repayment period in a {}-month term",
                terms.deferral_months,
                terms.total_months()
            ),
        ));
    }
    Ok(())
}

fn instalment_date(start: NaiveDate, month: u32) -> ImmoFinanceResult<NaiveDate> {
    start
        .checked_add_months(Months::new(month))
        .ok_or_else(|| ImmoFinanceError::DateError(format!("instalment {month} after {start}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
