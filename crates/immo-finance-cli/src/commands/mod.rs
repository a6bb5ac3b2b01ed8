pub mod capital_gains;
pub mod financing;
pub mod metrics;
pub mod taxation;
