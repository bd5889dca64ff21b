//! Lexicon-based sentiment scorer.
//!
//! Each token is looked up in a bundled word-valence table (-4..=4). A negator
//! in the three preceding tokens flips the valence, a booster directly before
//! the word amplifies it. The summed valence is squashed into a compound score
//! in `[-1, 1]`.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

/// Normalization constant for the compound score.
const ALPHA: f64 = 15.0;

/// Extra weight a booster adds to the following word's valence.
const BOOST: f64 = 0.3;

/// Score text into `[-1.0, 1.0]`. Empty or whitespace-only text is exactly 0.0.
pub fn score(text: &str) -> f64 {
    SentimentAnalyzer::new().score_text(text)
}

#[derive(Debug, Clone, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Compound score in `[-1.0, 1.0]`.
    pub fn score_text(&self, text: &str) -> f64 {
        let raw = self.raw_valence(text);
        compound(raw)
    }

    /// Summed valence before normalization.
    pub fn raw_valence(&self, text: &str) -> f64 {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut sum = 0.0f64;

        for (i, w) in tokens.iter().enumerate() {
            let base = self.word_score(w);
            if base == 0 {
                continue;
            }

            let mut v = base as f64;
            if i >= 1 && is_booster(&tokens[i - 1]) {
                v += BOOST * v.signum();
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(&tokens[i - k]));
            if negated {
                v = -v;
            }
            sum += v;
        }

        sum
    }
}

fn compound(raw: f64) -> f64 {
    if !raw.is_finite() || raw == 0.0 {
        return 0.0;
    }
    let c = raw / (raw * raw + ALPHA).sqrt();
    if c.is_finite() {
        c.clamp(-1.0, 1.0)
    } else {
        0.0
    }
}

/// Lower-case alphanumeric tokens. Apostrophes stay inside words so that
/// contractions like "isn't" survive as negators.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .map(|t| t.trim_matches('\''))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "can't"
            | "cannot"
            | "don't"
            | "doesn't"
            | "didn't"
            | "without"
    )
}

fn is_booster(tok: &str) -> bool {
    matches!(
        tok,
        "very" | "extremely" | "hugely" | "massively" | "super" | "really" | "incredibly"
    )
}
