use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Round a monetary amount to cents. Only used at presentation boundaries.
pub fn round_money(value: Money) -> Money {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round every decimal string of a serialized result for display.
///
/// Values under a field whose name marks a rate (`*_rate`, yields,
/// allowances, IRR) keep six decimals; every other amount is rounded to
/// cents. Nested values inherit the marker of an enclosing rate field.
/// Echoed inputs and free-text fields are left untouched.
pub fn round_presentation(value: &mut serde_json::Value) {
    round_field(false, value);
}

const VERBATIM_FIELDS: [&str; 5] = ["assumptions", "metadata", "methodology", "warnings", "name"];

fn round_field(is_rate: bool, value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if VERBATIM_FIELDS.contains(&key.as_str()) {
                    continue;
                }
                round_field(is_rate || is_rate_field(key), child);
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                round_field(is_rate, item);
            }
        }
        serde_json::Value::String(text) => {
            if let Ok(amount) = text.parse::<Decimal>() {
                *text = if is_rate {
                    amount
                        .round_dp_with_strategy(6, RoundingStrategy::MidpointAwayFromZero)
                        .normalize()
                        .to_string()
                } else {
                    round_money(amount).to_string()
                };
            }
        }
        _ => {}
    }
}

fn is_rate_field(name: &str) -> bool {
    name.ends_with("rate")
        || name.ends_with("yield")
        || name.ends_with("allowance")
        || name.ends_with("irr")
}

/// The four mutually exclusive rental-income tax treatments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    /// Unfurnished letting, flat 30% allowance
    MicroFoncier,
    /// Unfurnished letting, actual charges with capped global-income deficit
    ReelFoncier,
    /// Furnished letting, flat 50% allowance
    MicroBic,
    /// Furnished letting, actual charges plus depreciation
    ReelBic,
}

impl TaxRegime {
    pub const ALL: [TaxRegime; 4] = [
        TaxRegime::MicroFoncier,
        TaxRegime::ReelFoncier,
        TaxRegime::MicroBic,
        TaxRegime::ReelBic,
    ];

    /// Furnished-letting regimes are taxed on furnished rent.
    pub fn is_furnished(self) -> bool {
        matches!(self, TaxRegime::MicroBic | TaxRegime::ReelBic)
    }
}

impl std::fmt::Display for TaxRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TaxRegime::MicroFoncier => "micro_foncier",
            TaxRegime::ReelFoncier => "reel_foncier",
            TaxRegime::MicroBic => "micro_bic",
            TaxRegime::ReelBic => "reel_bic",
        };
        f.write_str(name)
    }
}

/// One value per tax regime, serialised as an object keyed by regime name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegimeBreakdown<T> {
    pub micro_foncier: T,
    pub reel_foncier: T,
    pub micro_bic: T,
    pub reel_bic: T,
}

impl<T> RegimeBreakdown<T> {
    /// Build a breakdown by evaluating `f` once per regime.
    pub fn from_fn(mut f: impl FnMut(TaxRegime) -> T) -> Self {
        RegimeBreakdown {
            micro_foncier: f(TaxRegime::MicroFoncier),
            reel_foncier: f(TaxRegime::ReelFoncier),
            micro_bic: f(TaxRegime::MicroBic),
            reel_bic: f(TaxRegime::ReelBic),
        }
    }

    pub fn get(&self, regime: TaxRegime) -> &T {
        match regime {
            TaxRegime::MicroFoncier => &self.micro_foncier,
            TaxRegime::ReelFoncier => &self.reel_foncier,
            TaxRegime::MicroBic => &self.micro_bic,
            TaxRegime::ReelBic => &self.reel_bic,
        }
    }

    pub fn map<U>(&self, mut f: impl FnMut(TaxRegime, &T) -> U) -> RegimeBreakdown<U> {
        RegimeBreakdown::from_fn(|regime| f(regime, self.get(regime)))
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}
