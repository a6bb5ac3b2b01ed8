use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImmoFinanceError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    /// Structurally invalid parameters that must abort the affected
    /// scenario instead of being clamped into misleading output.
    #[error("Configuration error: {field} — {reason}")]
    Configuration { field: String, reason: String },

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: Decimal,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Policy file error: {0}")]
    Policy(String),
}

impl ImmoFinanceError {
    pub(crate) fn configuration(field: &str, reason: impl Into<String>) -> Self {
        ImmoFinanceError::Configuration {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// True for errors the caller caused through its parameters, as opposed
    /// to numeric or serialization failures.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ImmoFinanceError::Configuration { .. } | ImmoFinanceError::InvalidInput { .. }
        )
    }
}

impl From<serde_json::Error> for ImmoFinanceError {
    fn from(e: serde_json::Error) -> Self {
        ImmoFinanceError::SerializationError(e.to_string())
    }
}

impl From<toml::de::Error> for ImmoFinanceError {
    fn from(e: toml::de::Error) -> Self {
        ImmoFinanceError::Policy(e.to_string())
    }
}
