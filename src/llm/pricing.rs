//! Static per-model pricing and cost estimation.
//!
//! Rates are per million tokens, in the fractional cost unit the usage API
//! reports. Models missing from the table fall back to a deliberately high
//! default so unknown models never under-report spend. Precision is kept at
//! 2 decimal places here; the analytics layer coarsens to an integer column.

#[derive(Debug, Clone, Copy)]
pub struct CostRate {
    pub input: f64,
    pub output: f64,
}

const DEFAULT_RATE: CostRate = CostRate { input: 100.0, output: 300.0 };

const RATES: &[(&str, CostRate)] = &[
    ("gpt-4o", CostRate { input: 2.5, output: 10.0 }),
    ("gpt-4o-mini", CostRate { input: 0.15, output: 0.6 }),
    ("gpt-4.1", CostRate { input: 2.0, output: 8.0 }),
    ("gpt-4.1-mini", CostRate { input: 0.4, output: 1.6 }),
    ("claude-opus-4-20250514", CostRate { input: 15.0, output: 75.0 }),
    ("claude-sonnet-4-20250514", CostRate { input: 3.0, output: 15.0 }),
    ("claude-3-5-haiku-20241022", CostRate { input: 0.8, output: 4.0 }),
    ("gemini-2.0-flash", CostRate { input: 0.1, output: 0.4 }),
    ("gemini-1.5-pro", CostRate { input: 1.25, output: 5.0 }),
];

/// Rate for an exact model name, or the default entry.
#[must_use]
pub fn rate_for(model: &str) -> CostRate {
    RATES
        .iter()
        .find(|(name, _)| *name == model)
        .map_or(DEFAULT_RATE, |(_, rate)| *rate)
}

/// Estimated cost of one call, rounded to 2 decimal places.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn estimate(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let rate = rate_for(model);
    let cost = input_tokens as f64 / 1_000_000.0 * rate.input + output_tokens as f64 / 1_000_000.0 * rate.output;
    (cost * 100.0).round() / 100.0
}

/// Integer form for the analytics column.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn to_stored_cents(cost: f64) -> i64 {
    (cost * 100.0).round() as i64
}
