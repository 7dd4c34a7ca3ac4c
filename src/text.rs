//! String helpers shared by the detector, the strategies and the gate:
//! key normalization, accent folding, casing classes, word tokenization and
//! similarity scores on a 0.0-1.0 scale.

use lazy_static::lazy_static;
use regex::Regex;
use strsim::normalized_levenshtein;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

lazy_static! {
    static ref WORD_PATTERN: Regex = Regex::new(r"\w+").unwrap();
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
}

/// Cache key form of a value: trimmed and lowercased.
pub fn normalize_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Whitelist form of a value: alphabetic characters only, lowercased.
pub fn whitelist_key(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphabetic())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Comparison form for reference matching: accents stripped, punctuation dropped,
/// whitespace collapsed, lowercased. "São  Paulo!" -> "sao paulo".
pub fn fold_for_match(value: &str) -> String {
    let stripped: String = value
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect();
    WHITESPACE.replace_all(stripped.trim(), " ").into_owned()
}

/// Byte ranges of every word (`\w+`) in `text`.
pub fn word_spans(text: &str) -> Vec<(usize, usize)> {
    WORD_PATTERN
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect()
}

/// Splits a column name on separators and camelCase boundaries, lowercased.
pub fn column_tokens(column: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in column.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                tokens.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

pub fn is_single_word(value: &str) -> bool {
    let trimmed = value.trim();
    !trimmed.is_empty() && word_spans(trimmed) == vec![(0, trimmed.len())]
}

/// At least one letter and no lowercase letters.
pub fn is_all_upper(value: &str) -> bool {
    let mut has_alpha = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            has_alpha = true;
            if c.is_lowercase() {
                return false;
            }
        }
    }
    has_alpha
}

/// Entirely uppercase and longer than one character.
pub fn is_acronym(value: &str) -> bool {
    value.trim().chars().count() > 1 && is_all_upper(value)
}

/// A short value made of digits and phone/id punctuation.
pub fn looks_numeric_short(value: &str, max_len: usize) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > max_len {
        return false;
    }
    let mut digits = 0;
    for c in trimmed.chars() {
        if c.is_ascii_digit() {
            digits += 1;
        } else if !matches!(c, '+' | '-' | '(' | ')' | '.' | '/' | ' ') {
            return false;
        }
    }
    digits > 0
}

/// Capitalization style of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasingClass {
    Upper,
    Title,
    Other,
}

impl CasingClass {
    pub fn of(value: &str) -> Self {
        if is_all_upper(value) {
            return CasingClass::Upper;
        }
        match value.chars().find(|c| c.is_alphabetic()) {
            Some(c) if c.is_uppercase() => CasingClass::Title,
            _ => CasingClass::Other,
        }
    }
}

/// Uppercase the first letter of every word, lowercase the rest.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut at_word_start = true;
    for c in value.chars() {
        if c.is_alphanumeric() || c == '\'' {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

/// Re-apply the casing style of `original` to `candidate`.
///
/// Acronym candidates keep their own casing, and a candidate that is already
/// title-styled is left alone so inner capitals ("McDonald") survive.
pub fn apply_casing(original: &str, candidate: &str) -> String {
    if is_acronym(candidate) {
        return candidate.to_string();
    }
    match CasingClass::of(original) {
        CasingClass::Upper => candidate.to_uppercase(),
        CasingClass::Title if CasingClass::of(candidate) == CasingClass::Title => {
            candidate.to_string()
        }
        CasingClass::Title => title_case(candidate),
        CasingClass::Other => candidate.to_string(),
    }
}

/// Normalized Levenshtein similarity: 1 - distance / max(len(a), len(b)).
pub fn ratio(a: &str, b: &str) -> f64 {
    normalized_levenshtein(a, b)
}

/// Best `ratio` of the shorter string against every same-length window of the longer.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let width = short.chars().count();
    if width == 0 {
        return if long.is_empty() { 1.0 } else { 0.0 };
    }
    let long: Vec<char> = long.chars().collect();
    long.windows(width)
        .map(|w| normalized_levenshtein(short, &w.iter().collect::<String>()))
        .fold(0.0, f64::max)
}

/// `ratio` after sorting the whitespace-separated tokens of both sides.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    fn sorted(s: &str) -> String {
        let mut tokens: Vec<&str> = s.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    }
    normalized_levenshtein(&sorted(a), &sorted(b))
}

/// Weighted blend of plain, token-order-insensitive and partial similarity.
/// Inputs are expected in `fold_for_match` form.
pub fn weighted_ratio(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let base = ratio(a, b);
    let sorted = token_sort_ratio(a, b) * 0.95;
    let (la, lb) = (a.chars().count() as f64, b.chars().count() as f64);
    let len_ratio = la.max(lb) / la.min(lb);
    let partial = if len_ratio >= 1.5 {
        let scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
        partial_ratio(a, b) * scale
    } else {
        0.0
    };
    base.max(sorted).max(partial)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(normalize_key("  Mumbay "), "mumbay");
        assert_eq!(whitelist_key("O'Neil-2"), "oneil");
        assert_eq!(fold_for_match("São  Paulo!"), "sao paulo");
    }

    #[test]
    fn test_casing_classes() {
        assert_eq!(CasingClass::of("INDIA"), CasingClass::Upper);
        assert_eq!(CasingClass::of("Mumbay"), CasingClass::Title);
        assert_eq!(CasingClass::of("mumbay"), CasingClass::Other);
        assert_eq!(CasingClass::of("123"), CasingClass::Other);
        assert!(is_acronym("UK"));
        assert!(!is_acronym("A"));
        assert!(!is_acronym("Uk"));
    }

    #[test]
    fn test_apply_casing() {
        assert_eq!(apply_casing("MUMBAY", "Mumbai"), "MUMBAI");
        assert_eq!(apply_casing("Mumbay", "mumbai"), "Mumbai");
        assert_eq!(apply_casing("new yrok", "New York"), "New York");
        assert_eq!(apply_casing("Mcdonlds", "McDonald's"), "McDonald's");
        assert_eq!(apply_casing("Untied states", "USA"), "USA");
        assert_eq!(title_case("new york-city"), "New York-City");
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio("abc", "abc"), 1.0);
        assert_eq!(ratio("", ""), 1.0);
        assert_eq!(ratio("abc", "xyz"), 0.0);
        // one substitution over six characters
        assert!((ratio("mumbay", "mumbai") - 5.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_ratio_prefers_token_order_and_substrings() {
        assert!(weighted_ratio("york new", "new york") > 0.9);
        assert!(weighted_ratio("acme", "acme corporation") >= 0.9 * 0.99);
        assert_eq!(weighted_ratio("", "x"), 0.0);
    }

    #[test]
    fn test_partial_ratio_best_window() {
        assert_eq!(partial_ratio("york", "new york city"), 1.0);
        assert_eq!(partial_ratio("", ""), 1.0);
        assert_eq!(partial_ratio("", "abc"), 0.0);
        assert!((partial_ratio("yirk", "new york") - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_column_tokens() {
        assert_eq!(column_tokens("CompanyName"), vec!["company", "name"]);
        assert_eq!(column_tokens("home_town-2"), vec!["home", "town", "2"]);
        assert_eq!(column_tokens("ROLL NO"), vec!["roll", "no"]);
    }

    #[test]
    fn test_numeric_short() {
        assert!(looks_numeric_short("+91 98200-1234", 16));
        assert!(looks_numeric_short("0042", 12));
        assert!(!looks_numeric_short("12a", 12));
        assert!(!looks_numeric_short("1234567890123", 12));
        assert!(!looks_numeric_short("--", 12));
    }

    #[test]
    fn test_word_spans() {
        assert_eq!(word_spans("helo, wrld!"), vec![(0, 4), (6, 10)]);
        assert!(is_single_word(" mumbay "));
        assert!(!is_single_word("new york"));
    }
}
