pub mod allowances;
pub mod report;
pub mod sale;

pub use allowances::holding_allowance;
pub use report::{calculate_all_capital_gain_regimes, SaleSummary};
pub use sale::{compute_sale, tax_capital_gain, CapitalGainResult, GainBasis, SaleInput};
