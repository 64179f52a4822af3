use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;

static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_]+").expect("static pattern must compile"));

/// Lower-cased unique tokens, split on runs of non-word characters.
pub fn tokenize(text: &str) -> HashSet<String> {
    let lowered = text.to_lowercase();
    NON_WORD
        .split(&lowered)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Naive cosine-like overlap: `|A ∩ B| / sqrt(|A| * |B|)`, with the denominator forced to 1
/// when either side has no tokens. A placeholder quality signal, not a semantic measure.
pub fn token_overlap(a: &str, b: &str) -> f64 {
    let left = tokenize(a);
    let right = tokenize(b);
    let shared = left.intersection(&right).count();

    let product = left.len() * right.len();
    let denominator = if product == 0 {
        1.0
    } else {
        (product as f64).sqrt()
    };
    shared as f64 / denominator
}
