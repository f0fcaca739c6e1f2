//! Signal key normalization
//!
//! Reason strings carry live numbers ("Buy pressure 3.2x", "Liquidity $48.2K").
//! Learning needs a key that stays the same across trades, so every dynamic
//! value is stripped before the text is used as a join key.

use regex::Regex;
use std::sync::OnceLock;

/// Parenthetical detail: "(top5 32%)"
static PARENTHETICAL: OnceLock<Regex> = OnceLock::new();
/// Dollar amounts with optional magnitude suffix: "$48.2K", "$1,200"
static CURRENCY: OnceLock<Regex> = OnceLock::new();
/// Percentages: "+12.5%", "-40%"
static PERCENT: OnceLock<Regex> = OnceLock::new();
/// Durations: "45m", "2.5h", "30 secs", "3 days"
static DURATION: OnceLock<Regex> = OnceLock::new();
/// Multipliers and quote amounts: "3.2x", "0.25 SOL"
static MAGNITUDE: OnceLock<Regex> = OnceLock::new();
/// Any leftover number
static NUMBER: OnceLock<Regex> = OnceLock::new();

fn parenthetical() -> &'static Regex {
    PARENTHETICAL.get_or_init(|| Regex::new(r"\([^)]*\)").expect("Invalid regex"))
}

fn currency() -> &'static Regex {
    CURRENCY.get_or_init(|| Regex::new(r"\$\s?[\d,]+(?:\.\d+)?\s?[kKmMbB]?").expect("Invalid regex"))
}

fn percent() -> &'static Regex {
    PERCENT.get_or_init(|| Regex::new(r"[+-]?\b\d+(?:\.\d+)?\s?%").expect("Invalid regex"))
}

fn duration() -> &'static Regex {
    DURATION.get_or_init(|| {
        Regex::new(
            r"(?i)\b\d+(?:\.\d+)?\s?(?:ms|secs?|seconds?|s|mins?|minutes?|m|hrs?|hours?|h|days?|d)\b",
        )
        .expect("Invalid regex")
    })
}

fn magnitude() -> &'static Regex {
    MAGNITUDE.get_or_init(|| {
        Regex::new(r"(?i)[+-]?\b\d+(?:\.\d+)?\s?(?:x|sol)\b").expect("Invalid regex")
    })
}

fn number() -> &'static Regex {
    NUMBER.get_or_init(|| Regex::new(r"[+-]?\b\d+(?:[.,]\d+)*\b").expect("Invalid regex"))
}

/// Reduce a human-readable reason to its stable signal key.
///
/// Semantically identical reasons that differ only in their numbers map to
/// the same key. The result is lowercase with single spaces and no trailing
/// separators.
pub fn normalize_signal(reason: &str) -> String {
    let mut text = parenthetical().replace_all(reason, " ").into_owned();
    for re in [currency(), percent(), duration(), magnitude(), number()] {
        text = re.replace_all(&text, " ").into_owned();
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | ',' | '.' | '/' | '='))
        .to_lowercase()
}

/// Normalize a list of reasons, dropping empties and duplicates while keeping order
pub fn normalize_all<S: AsRef<str>>(reasons: &[S]) -> Vec<String> {
    let mut keys: Vec<String> = Vec::with_capacity(reasons.len());
    for reason in reasons {
        let key = normalize_signal(reason.as_ref());
        if !key.is_empty() && !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}
