pub mod error;
pub mod policy;
pub mod time_value;
pub mod types;

pub mod capital_gains;
pub mod financing;
pub mod investment;
pub mod metrics;
pub mod taxation;

pub use error::ImmoFinanceError;
pub use types::*;

pub type ImmoFinanceResult<T> = Result<T, ImmoFinanceError>;
