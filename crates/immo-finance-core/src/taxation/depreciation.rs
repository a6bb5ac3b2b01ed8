use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ImmoFinanceError;
use crate::types::Money;
use crate::ImmoFinanceResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Building,
    Furniture,
}

/// Order in which asset classes absorb the available taxable base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepreciationPriority {
    #[default]
    BuildingFirst,
    FurnitureFirst,
}

impl DepreciationPriority {
    pub fn order(self) -> [AssetClass; 2] {
        match self {
            DepreciationPriority::BuildingFirst => [AssetClass::Building, AssetClass::Furniture],
            DepreciationPriority::FurnitureFirst => [AssetClass::Furniture, AssetClass::Building],
        }
    }
}

/// Running depreciation account of one asset class.
///
/// `backlog` is always `cumulative_theoretical - cumulative_used`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetLedger {
    pub class: AssetClass,
    pub asset_value: Money,
    pub amortization_years: u32,
    pub cumulative_theoretical: Money,
    pub cumulative_used: Money,
    pub backlog: Money,
}

impl AssetLedger {
    pub fn new(class: AssetClass, asset_value: Money, amortization_years: u32) -> Self {
        AssetLedger {
            class,
            asset_value,
            amortization_years,
            cumulative_theoretical: Decimal::ZERO,
            cumulative_used: Decimal::ZERO,
            backlog: Decimal::ZERO,
        }
    }

    /// Straight-line annuity, truncated so the total never exceeds the asset value.
    fn next_theoretical(&self) -> Money {
        if self.amortization_years == 0 || self.asset_value <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let annuity = self.asset_value / Decimal::from(self.amortization_years);
        annuity
            .min(self.asset_value - self.cumulative_theoretical)
            .max(Decimal::ZERO)
    }
}

/// Depreciation accounts of a project, threaded year to year by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationState {
    /// Last year advanced, `None` before the first year
    pub last_year: Option<i32>,
    pub building: AssetLedger,
    pub furniture: AssetLedger,
    #[serde(default)]
    pub priority: DepreciationPriority,
}

impl DepreciationState {
    pub fn new(
        building_value: Money,
        building_years: u32,
        furniture_value: Money,
        furniture_years: u32,
        priority: DepreciationPriority,
    ) -> Self {
        DepreciationState {
            last_year: None,
            building: AssetLedger::new(AssetClass::Building, building_value, building_years),
            furniture: AssetLedger::new(AssetClass::Furniture, furniture_value, furniture_years),
            priority,
        }
    }

    pub fn ledger(&self, class: AssetClass) -> &AssetLedger {
        match class {
            AssetClass::Building => &self.building,
            AssetClass::Furniture => &self.furniture,
        }
    }

    fn ledger_mut(&mut self, class: AssetClass) -> &mut AssetLedger {
        match class {
            AssetClass::Building => &mut self.building,
            AssetClass::Furniture => &mut self.furniture,
        }
    }

    pub fn cumulative_used(&self) -> Money {
        self.building.cumulative_used + self.furniture.cumulative_used
    }

    pub fn cumulative_theoretical(&self) -> Money {
        self.building.cumulative_theoretical + self.furniture.cumulative_theoretical
    }

    pub fn backlog(&self) -> Money {
        self.building.backlog + self.furniture.backlog
    }
}

/// One asset class's movement for a year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetYear {
    pub theoretical: Money,
    pub used: Money,
    /// theoretical - used for this year alone (negative when backlog was absorbed)
    pub carried_forward: Money,
    /// Unused depreciation available to later years
    pub backlog: Money,
}

/// Ledger movement for one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepreciationYear {
    pub year: i32,
    pub taxable_income_before_depreciation: Money,
    pub available_base: Money,
    pub building: AssetYear,
    pub furniture: AssetYear,
    pub total_used: Money,
    pub total_backlog: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Advance the ledgers by one year.
///
/// Each class accrues its straight-line annuity, then classes absorb the
/// available base in priority order: `used = min(theoretical + backlog,
/// remaining base)`. Whatever is not used joins the backlog, which never
/// expires. Years must be advanced consecutively.
pub fn advance_year(
    state: &DepreciationState,
    year: i32,
    taxable_income_before_depreciation: Money,
) -> ImmoFinanceResult<(DepreciationYear, DepreciationState)> {
    if let Some(last) = state.last_year {
        if year != last + 1 {
            return Err(ImmoFinanceError::configuration(
                "year",
                format!("Depreciation ledger is at {last}; cannot advance to {year}"),
            ));
        }
    }

    let mut next = state.clone();
    next.last_year = Some(year);

    let available_base = taxable_income_before_depreciation.max(Decimal::ZERO);
    let mut remaining_base = available_base;
    let mut building = AssetYear::default();
    let mut furniture = AssetYear::default();

    for class in state.priority.order() {
        let ledger = next.ledger_mut(class);
        let theoretical = ledger.next_theoretical();
        let claimable = theoretical + ledger.backlog;
        let used = claimable.min(remaining_base);
        remaining_base -= used;

        ledger.cumulative_theoretical += theoretical;
        ledger.cumulative_used += used;
        ledger.backlog = claimable - used;

        let movement = AssetYear {
            theoretical,
            used,
            carried_forward: theoretical - used,
            backlog: ledger.backlog,
        };
        match class {
            AssetClass::Building => building = movement,
            AssetClass::Furniture => furniture = movement,
        }
    }

    let total_used = building.used + furniture.used;
    let total_backlog = next.backlog();

    tracing::debug!(
        year,
        %available_base,
        %total_used,
        %total_backlog,
        "depreciation ledger advanced"
    );

    Ok((
        DepreciationYear {
            year,
            taxable_income_before_depreciation,
            available_base,
            building,
            furniture,
            total_used,
            total_backlog,
        },
        next,
    ))
}

/// Replay a sequence of years from an initial state.
pub fn replay(
    initial: &DepreciationState,
    incomes: &[(i32, Money)],
) -> ImmoFinanceResult<(Vec<DepreciationYear>, DepreciationState)> {
    let mut state = initial.clone();
    let mut years = Vec::with_capacity(incomes.len());
    for (year, income) in incomes {
        let (movement, next) = advance_year(&state, *year, *income)?;
        years.push(movement);
        state = next;
    }
    Ok((years, state))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
