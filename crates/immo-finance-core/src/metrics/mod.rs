pub mod project;

pub use project::{calculate_financial_metrics, FinancialMetrics, YearlyCashFlow, Yields};
