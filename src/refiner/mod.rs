//! Answer Refiner & Extractor (spec.md §4.8): post-processes handler
//! output to satisfy its category's format contract, recording
//! `FORMAT_FALLBACK` when it has to synthesise rather than extract.

use regex::Regex;
use std::sync::OnceLock;

use crate::domain::Category;
use crate::error::ErrorKind;

/// Result of refining one answer: the contract-satisfying text plus any
/// fallback that had to be recorded.
#[derive(Debug, Clone)]
pub struct RefinedAnswer {
    pub text: String,
    pub fallback: Option<ErrorKind>,
}

pub fn refine(category: Category, raw_text: &str, highest_scoring_choice: Option<&str>) -> RefinedAnswer {
    match category {
        Category::Reasoning => refine_letter(raw_text, highest_scoring_choice),
        Category::Math => refine_math(raw_text),
        Category::Coding => refine_coding(raw_text),
        Category::Rag => refine_ranking(raw_text),
        Category::LongContext => RefinedAnswer {
            text: raw_text.trim().to_string(),
            fallback: None,
        },
        _ => RefinedAnswer {
            text: raw_text.trim().to_string(),
            fallback: None,
        },
    }
}

fn letter_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^\s*([A-E])\s*$").unwrap())
}

fn any_capital_letter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b([A-E])\b").unwrap())
}

/// Letter extraction fallback chain (spec.md §4.8):
/// 1. the last standalone uppercase A-E on its own line,
/// 2. else the last capital letter in any answer-like phrase,
/// 3. else `FORMAT_FALLBACK`, returning the first letter of the
///    highest-scoring choice.
fn refine_letter(raw_text: &str, highest_scoring_choice: Option<&str>) -> RefinedAnswer {
    if let Some(m) = letter_line_re().find_iter(raw_text).last() {
        return RefinedAnswer {
            text: m.as_str().trim().to_string(),
            fallback: None,
        };
    }
    if let Some(m) = any_capital_letter_re().find_iter(raw_text).last() {
        return RefinedAnswer {
            text: m.as_str().to_string(),
            fallback: None,
        };
    }

    let fallback_letter = highest_scoring_choice
        .and_then(|c| c.trim().chars().next())
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('A');
    RefinedAnswer {
        text: fallback_letter.to_string(),
        fallback: Some(ErrorKind::FormatFallback {
            detail: "no extractable letter in handler output".to_string(),
        }),
    }
}

fn hash_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"####\s*(-?[0-9]+(?:\.[0-9]+)?)").unwrap())
}

fn last_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?[0-9]+(?:\.[0-9]+)?").unwrap())
}

/// `#### N` enforcement (spec.md §4.8): find an existing marker, else
/// extract the last numeric token and append one.
fn refine_math(raw_text: &str) -> RefinedAnswer {
    if hash_marker_re().is_match(raw_text) {
        return RefinedAnswer {
            text: raw_text.trim().to_string(),
            fallback: None,
        };
    }
    if let Some(m) = last_number_re().find_iter(raw_text).last() {
        let n = m.as_str();
        return RefinedAnswer {
            text: format!("{}\n#### {n}", raw_text.trim()),
            fallback: Some(ErrorKind::FormatFallback {
                detail: "synthesised #### marker from last numeric token".to_string(),
            }),
        };
    }
    RefinedAnswer {
        text: format!("{}\n#### 0", raw_text.trim()),
        fallback: Some(ErrorKind::FormatFallback {
            detail: "no numeric token found, defaulted to 0".to_string(),
        }),
    }
}

fn fenced_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[a-zA-Z]*\n(.*?)```").unwrap())
}

/// Extracts the first complete fenced code block (spec.md §4.8: "extract
/// the first complete function definition whose name matches the
/// expected signature" — signature matching is left to the coding
/// handler, which already knows the expected name; this stage's job is
/// just pulling the fence out cleanly).
fn refine_coding(raw_text: &str) -> RefinedAnswer {
    if let Some(caps) = fenced_block_re().captures(raw_text) {
        return RefinedAnswer {
            text: format!("```\n{}\n```", caps[1].trim_end()),
            fallback: None,
        };
    }
    RefinedAnswer {
        text: format!("```\n{}\n```", raw_text.trim()),
        fallback: Some(ErrorKind::FormatFallback {
            detail: "no fenced block found, wrapped raw output".to_string(),
        }),
    }
}

fn integer_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d+").unwrap())
}

/// Ranking extraction (spec.md §4.8): comma-separated list of integers,
/// non-numeric tokens dropped, duplicates removed preserving first
/// occurrence.
fn refine_ranking(raw_text: &str) -> RefinedAnswer {
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::new();
    for token in raw_text.split(',') {
        if let Some(m) = integer_token_re().find(token) {
            let value = m.as_str().to_string();
            if seen.insert(value.clone()) {
                ordered.push(value);
            }
        }
    }
    if ordered.is_empty() {
        return RefinedAnswer {
            text: String::new(),
            fallback: Some(ErrorKind::FormatFallback {
                detail: "no integer passage IDs found in ranking output".to_string(),
            }),
        };
    }
    RefinedAnswer {
        text: ordered.join(","),
        fallback: None,
    }
}
