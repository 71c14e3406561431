//! Best-effort cost estimation for completions.
//!
//! Rates are USD per million tokens. The table only needs to cover the models
//! we actually route to; an unknown model is logged and skipped rather than
//! treated as an error.

use super::Usage;

/// Input/output rates in USD per 1M tokens.
#[derive(Debug, Clone, Copy)]
pub struct ModelRates {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}

const RATE_TABLE: &[(&str, ModelRates)] = &[
    (
        "gpt-4o",
        ModelRates {
            input_per_mtok: 2.50,
            output_per_mtok: 10.00,
        },
    ),
    (
        "gpt-4o-mini",
        ModelRates {
            input_per_mtok: 0.15,
            output_per_mtok: 0.60,
        },
    ),
    (
        "claude-sonnet-4-20250514",
        ModelRates {
            input_per_mtok: 3.00,
            output_per_mtok: 15.00,
        },
    ),
    (
        "claude-3-5-sonnet-20241022",
        ModelRates {
            input_per_mtok: 3.00,
            output_per_mtok: 15.00,
        },
    ),
    (
        "deepseek-chat",
        ModelRates {
            input_per_mtok: 0.27,
            output_per_mtok: 1.10,
        },
    ),
];

/// Look up rates for a model id. Prefix matching covers dated snapshots
/// (`gpt-4o-2024-11-20` resolves to the `gpt-4o` row).
pub fn rates_for(model: &str) -> Option<ModelRates> {
    let mut best: Option<(&str, ModelRates)> = None;
    for (name, rates) in RATE_TABLE {
        if model == *name || model.starts_with(&format!("{name}-")) {
            match best {
                Some((current, _)) if current.len() >= name.len() => {}
                _ => best = Some((name, *rates)),
            }
        }
    }
    best.map(|(_, rates)| rates)
}

/// Estimate the cost of one completion in USD, when the model is known and
/// the backend reported usage.
pub fn estimate_cost(model: &str, usage: &Usage) -> Option<f64> {
    let rates = rates_for(model)?;
    let input = usage.prompt_tokens as f64 / 1_000_000.0 * rates.input_per_mtok;
    let output = usage.completion_tokens as f64 / 1_000_000.0 * rates.output_per_mtok;
    Some(input + output)
}
