pub mod depreciation;
pub mod regimes;
pub mod timeline;

pub use depreciation::{advance_year, AssetClass, DepreciationPriority, DepreciationState};
pub use regimes::{compute_year, TaxCarryState, TaxResult, YearTaxation};
pub use timeline::{calculate_all_tax_regimes, tax_timeline, AnnualTaxReport};
