//! Similarity measure (spec.md §4.7): numeric answers compare by
//! normalised equality, letters by uppercase equality, free text by a
//! length-band plus key-token Jaccard threshold.

use std::collections::HashSet;

/// Default Jaccard threshold for free-text agreement (spec.md §4.7:
/// "hierarchical_consensus ... if their responses agree above a
/// configurable similarity threshold (default 0.8)").
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.8;

/// Strips thousands separators and trailing zeros so `"1,000.00"` and
/// `"1000"` compare equal.
fn normalize_numeric(s: &str) -> Option<String> {
    let cleaned: String = s.chars().filter(|c| *c != ',').collect();
    let value: f64 = cleaned.trim().parse().ok()?;
    Some(format!("{value}"))
}

/// Returns `true` when `a` and `b` should be treated as the same answer.
/// Tries numeric normalisation first, then single-letter equality, then
/// falls back to the free-text measure.
pub fn answers_agree(a: &str, b: &str) -> bool {
    let (a, b) = (a.trim(), b.trim());

    if let (Some(na), Some(nb)) = (normalize_numeric(a), normalize_numeric(b)) {
        return na == nb;
    }
    if a.len() == 1 && b.len() == 1 {
        return a.eq_ignore_ascii_case(b);
    }
    free_text_similar(a, b, DEFAULT_SIMILARITY_THRESHOLD)
}

fn key_tokens(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(String::from)
        .collect()
}

/// Length-band + key-token Jaccard ≥ `threshold` (spec.md §4.7).
pub fn free_text_similar(a: &str, b: &str, threshold: f32) -> bool {
    let (len_a, len_b) = (a.split_whitespace().count(), b.split_whitespace().count());
    let longer = len_a.max(len_b).max(1);
    let shorter = len_a.min(len_b);
    if (shorter as f32 / longer as f32) < 0.5 {
        return false;
    }

    let tokens_a = key_tokens(a);
    let tokens_b = key_tokens(b);
    if tokens_a.is_empty() && tokens_b.is_empty() {
        return true;
    }
    let intersection = tokens_a.intersection(&tokens_b).count() as f32;
    let union = tokens_a.union(&tokens_b).count().max(1) as f32;
    intersection / union >= threshold
}
