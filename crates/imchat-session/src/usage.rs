use serde::{Deserialize, Serialize};

/// Counts the tokens a model would see for a piece of text.
///
/// The tokenizer is model-specific and lives outside this crate. Any
/// `Fn(&str) -> usize` closure works as a counter.
pub trait TokenCounter {
    /// Number of tokens `text` encodes to.
    fn count(&self, text: &str) -> usize;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> usize,
{
    fn count(&self, text: &str) -> usize {
        self(text)
    }
}

/// Token and cost figures for a single exchange.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnUsage {
    /// Prompt tokens plus response tokens.
    pub tokens: usize,
    /// Estimated price in the catalog's currency.
    pub price: f64,
}

impl TurnUsage {
    /// Combines prompt and response counts into a priced turn.
    pub fn compute(
        prompt: &str,
        response: &str,
        counter: &dyn TokenCounter,
        price_per_1k_tokens: f64,
    ) -> Self {
        let tokens = counter.count(prompt) + counter.count(response);
        Self {
            tokens,
            price: price_per_1k_tokens * tokens as f64 / 1000.0,
        }
    }
}

/// Running totals since the session started (or since the last explicit
/// reset).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    /// Accumulated tokens.
    pub tokens: usize,
    /// Accumulated price.
    pub price: f64,
}

impl UsageTotals {
    /// Adds one turn to the totals.
    pub fn add(&mut self, turn: TurnUsage) {
        self.tokens += turn.tokens;
        self.price += turn.price;
    }
}
