//! Character-based token estimation.
//!
//! Uses a fixed chars-per-token ratio (4 by default, roughly right for
//! English with LLaMA-family tokenizers) and rounds up, so the estimate of
//! a concatenation never exceeds the sum of the estimates of its parts.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenEstimator {
    chars_per_token: usize,
}

impl TokenEstimator {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }

    pub fn estimate(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self::new(4)
    }
}
