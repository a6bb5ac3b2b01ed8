use rust_decimal::Decimal;

use crate::policy::AllowanceSchedule;
use crate::types::Rate;

/// Allowance earned after `holding_years` full years of ownership, in [0, 1].
pub fn holding_allowance(schedule: &AllowanceSchedule, holding_years: u32) -> Rate {
    if holding_years >= schedule.full_exemption_year {
        return Decimal::ONE;
    }
    if holding_years <= schedule.grace_years {
        return Decimal::ZERO;
    }

    let standard_years = holding_years
        .min(schedule.standard_until_year)
        .saturating_sub(schedule.grace_years);
    let mut allowance = schedule.annual_rate * Decimal::from(standard_years);

    for year in (schedule.standard_until_year + 1)..=holding_years {
        allowance += if schedule.bonus_year == Some(year) {
            schedule.bonus_rate
        } else {
            schedule.late_annual_rate
        };
    }

    allowance.min(Decimal::ONE)
}
