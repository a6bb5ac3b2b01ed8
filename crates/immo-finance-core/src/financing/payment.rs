use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ImmoFinanceError;
use crate::types::{Money, Rate};
use crate::ImmoFinanceResult;

const RATE_SEED: Rate = dec!(0.005);
const RATE_FLOOR: Rate = dec!(0.001);
const RATE_CEILING: Rate = dec!(0.1);
const STEP_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_RATE_ITERATIONS: u32 = 100;
const MIN_DATA_POINTS: u32 = 3;

/// (1 + r)^n
pub(crate) fn compound_factor(monthly_rate: Rate, months: u32) -> ImmoFinanceResult<Decimal> {
    (Decimal::ONE + monthly_rate)
        .checked_powu(u64::from(months))
        .ok_or_else(|| ImmoFinanceError::InvalidInput {
            field: "monthly_rate".into(),
            reason: format!("compounding {monthly_rate} over {months} months overflows"),
        })
}

/// Standard fixed-rate annuity: P * r(1+r)^n / ((1+r)^n - 1), or P / n when r = 0.
pub fn monthly_payment(
    principal: Money,
    monthly_rate: Rate,
    total_months: u32,
) -> ImmoFinanceResult<Money> {
    if total_months == 0 {
        return Err(ImmoFinanceError::DivisionByZero {
            context: "monthly payment over zero months".into(),
        });
    }

    if monthly_rate.is_zero() {
        return Ok(principal / Decimal::from(total_months));
    }

    let compound = compound_factor(monthly_rate, total_months)?;
    let denominator = compound - Decimal::ONE;

    if denominator.is_zero() {
        return Err(ImmoFinanceError::DivisionByZero {
            context: "annuity denominator".into(),
        });
    }

    Ok(principal * monthly_rate * compound / denominator)
}

/// Outcome of reconstructing a rate from a payment stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateInference {
    /// Zero when the solver did not converge or inputs were degenerate
    pub monthly_rate: Rate,
    /// monthly_rate * 12
    pub annual_rate: Rate,
    pub iterations: u32,
    pub converged: bool,
}

impl RateInference {
    fn unknown(iterations: u32) -> Self {
        RateInference {
            monthly_rate: Decimal::ZERO,
            annual_rate: Decimal::ZERO,
            iterations,
            converged: false,
        }
    }
}

/// Invert the annuity formula for the monthly rate.
///
/// Newton-Raphson on `f(r) = M - r*P / (1 - (1+r)^-n)`, seeded at 0.5% per
/// month, with the iterate clamped to [0.1%, 10%] after every step.
/// Non-convergence and degenerate inputs yield a zero rate; the caller
/// treats that as "rate unknown".
pub fn solve_monthly_rate(principal: Money, payment: Money, total_months: u32) -> RateInference {
    if total_months < MIN_DATA_POINTS
        || principal <= Decimal::ZERO
        || payment <= Decimal::ZERO
        || payment * Decimal::from(total_months) <= principal
    {
        return RateInference::unknown(0);
    }

    let n = Decimal::from(total_months);
    let mut rate = RATE_SEED;

    for i in 0..MAX_RATE_ITERATIONS {
        let compound = match compound_factor(rate, total_months) {
            Ok(c) => c,
            Err(_) => return RateInference::unknown(i),
        };
        let discount = Decimal::ONE / compound;
        let denom = Decimal::ONE - discount;
        if denom.is_zero() {
            return RateInference::unknown(i);
        }

        let annuity = rate * principal / denom;
        let f = payment - annuity;
        // d/dr [rP / (1 - (1+r)^-n)]
        let d_annuity = principal * (denom - rate * n * discount / (Decimal::ONE + rate))
            / (denom * denom);
        if d_annuity.is_zero() {
            return RateInference::unknown(i);
        }

        // f'(r) = -d_annuity
        let step = f / -d_annuity;
        let next = (rate - step).clamp(RATE_FLOOR, RATE_CEILING);

        if step.abs() < STEP_THRESHOLD {
            return RateInference {
                monthly_rate: next,
                annual_rate: next * dec!(12),
                iterations: i + 1,
                converged: true,
            };
        }
        rate = next;
    }

    tracing::warn!(
        %principal,
        %payment,
        total_months,
        "rate solver did not converge, reporting rate as unknown"
    );
    RateInference::unknown(MAX_RATE_ITERATIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_payment_200k_3pct_20y() {
        let pmt = monthly_payment(dec!(200000), dec!(0.03) / dec!(12), 240).unwrap();
        assert!((pmt - dec!(1109.20)).abs() < dec!(0.01), "payment {pmt}");
    }

    #[test]
    fn test_zero_rate_is_straight_line() {
        let pmt = monthly_payment(dec!(120000), Decimal::ZERO, 240).unwrap();
        assert_eq!(pmt, dec!(500));
    }

    #[test]
    fn test_zero_months_rejected() {
        assert!(monthly_payment(dec!(1000), dec!(0.01), 0).is_err());
    }

    #[test]
    fn test_solver_recovers_rate() {
        let r = dec!(0.004);
        let pmt = monthly_payment(dec!(150000), r, 300).unwrap();
        let inferred = solve_monthly_rate(dec!(150000), pmt, 300);
        assert!(inferred.converged);
        assert!((inferred.monthly_rate - r).abs() < dec!(0.0000001));
        assert_eq!(inferred.annual_rate, inferred.monthly_rate * dec!(12));
    }

    #[test]
    fn test_solver_degenerate_inputs() {
        assert_eq!(solve_monthly_rate(dec!(1000), dec!(400), 2).monthly_rate, Decimal::ZERO);
        assert_eq!(solve_monthly_rate(Decimal::ZERO, dec!(400), 12).monthly_rate, Decimal::ZERO);
        // Payments that do not even repay principal imply a non-positive rate
        assert!(!solve_monthly_rate(dec!(12000), dec!(900), 12).converged);
    }

    #[test]
    fn test_solver_out_of_band_rate_not_converged() {
        // 20% per month is outside the clamped search band
        let pmt = monthly_payment(dec!(10000), dec!(0.2), 36).unwrap();
        let inferred = solve_monthly_rate(dec!(10000), pmt, 36);
        assert!(!inferred.converged);
        assert_eq!(inferred.monthly_rate, Decimal::ZERO);
    }
}
