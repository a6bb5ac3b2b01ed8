pub mod amortization;
pub mod import;
pub mod payment;

pub use amortization::{
    build_schedule, calculate_monthly_payment, generate_amortization_schedule, AmortizationRow,
    AmortizationSchedule, DeferralKind, EarlyRepaymentPenalty, LoanTerms,
};
pub use payment::RateInference;
