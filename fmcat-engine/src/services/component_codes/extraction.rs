//! Component code extraction from free-form provider text
//!
//! Rules are tried in a fixed order. The early rules only accept
//! uppercase tokens of a specific shape; later rules are progressively more
//! permissive and anchor on keywords, arrows or quotes instead. The first
//! candidate that passes [`is_valid_code`] wins.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// A named extraction rule
pub struct ExtractionRule {
    pub name: &'static str,
    pattern: Regex,
}

impl ExtractionRule {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("extraction rule pattern"),
        }
    }

    /// Candidate codes in order of appearance
    fn candidates<'t>(&'t self, text: &'t str) -> impl Iterator<Item = String> + 't {
        self.pattern.captures_iter(text).filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(0))
                .map(|m| m.as_str().to_ascii_uppercase())
        })
    }
}

static RULES: Lazy<Vec<ExtractionRule>> = Lazy::new(|| {
    vec![
        ExtractionRule::new("four_letters", r"\b[A-Z]{4}\b"),
        ExtractionRule::new("three_letters_digit", r"\b[A-Z]{3}[0-9]\b"),
        ExtractionRule::new("two_letters_two_digits", r"\b[A-Z]{2}[0-9]{2}\b"),
        ExtractionRule::new("letter_three_digits", r"\b[A-Z][0-9]{3}\b"),
        ExtractionRule::new("any_alphanumeric", r"\b[A-Z0-9]{4}\b"),
        ExtractionRule::new(
            "code_label",
            r#"(?i)\bcode\b[^A-Za-z0-9]{0,8}([A-Za-z0-9]{4})\b"#,
        ),
        ExtractionRule::new("arrow", r#"(?:→|->|=>)\s*["'`]?([A-Za-z0-9]{4})\b"#),
        ExtractionRule::new("quoted", r#"["'`]([A-Za-z0-9]{4})["'`]"#),
    ]
});

/// Names of the extraction rules in application order
pub fn rule_names() -> Vec<&'static str> {
    RULES.iter().map(|r| r.name).collect()
}

/// Extract the first valid code for `component` from `text`
pub fn extract_code(text: &str, component: &str) -> Option<String> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    for rule in RULES.iter() {
        if let Some(code) = rule.candidates(text).find(|c| is_valid_code(c, component)) {
            tracing::trace!(rule = rule.name, code = %code, "Extracted component code");
            return Some(code);
        }
    }

    None
}

/// Shape and plausibility check shared by every rule
///
/// A code is four ASCII alphanumerics with at least one letter. It must
/// also share a character with the first two letters of the component
/// name, or contain at least two distinct characters.
pub fn is_valid_code(code: &str, component: &str) -> bool {
    if code.len() != 4 || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return false;
    }
    if !code.chars().any(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    let code = code.to_ascii_uppercase();
    let leading: Vec<char> = component
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(2)
        .map(|c| c.to_ascii_uppercase())
        .collect();
    let shares_leading = code.chars().any(|c| leading.contains(&c));
    let distinct = code.chars().collect::<HashSet<_>>().len();

    shares_leading || distinct >= 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order_is_fixed() {
        assert_eq!(
            rule_names(),
            vec![
                "four_letters",
                "three_letters_digit",
                "two_letters_two_digits",
                "letter_three_digits",
                "any_alphanumeric",
                "code_label",
                "arrow",
                "quoted",
            ]
        );
    }

    #[test]
    fn test_plain_uppercase_answer() {
        assert_eq!(extract_code("BRNG", "Bearing").as_deref(), Some("BRNG"));
        assert_eq!(extract_code("The code is BRNG.", "Bearing").as_deref(), Some("BRNG"));
    }

    #[test]
    fn test_letters_preferred_over_alphanumeric() {
        // Both tokens are valid; the pure-letter rule runs first
        assert_eq!(extract_code("PMP1 or PUMP", "Pump").as_deref(), Some("PUMP"));
    }

    #[test]
    fn test_mixed_shapes() {
        assert_eq!(extract_code("Use PMP1", "Pump").as_deref(), Some("PMP1"));
        assert_eq!(extract_code("answer: SL01", "Seal").as_deref(), Some("SL01"));
        assert_eq!(extract_code("V100", "Valve").as_deref(), Some("V100"));
    }

    #[test]
    fn test_keyword_anchored_lowercase() {
        assert_eq!(extract_code("code: brng", "Bearing").as_deref(), Some("BRNG"));
        assert_eq!(extract_code("bearing -> brg2", "Bearing").as_deref(), Some("BRG2"));
        assert_eq!(extract_code("try 'sl0a' maybe", "Seal").as_deref(), Some("SL0A"));
    }

    #[test]
    fn test_nothing_valid() {
        assert_eq!(extract_code("", "Seal"), None);
        assert_eq!(extract_code("   ", "Seal"), None);
        assert_eq!(extract_code("1234", "Seal"), None);
        assert_eq!(extract_code("I cannot help with that", "Seal"), None);
    }

    #[test]
    fn test_validation_predicate() {
        assert!(is_valid_code("SEAL", "Seal"));
        assert!(!is_valid_code("SEA", "Seal"));
        assert!(!is_valid_code("9999", "Seal"));
        assert!(!is_valid_code("SE-L", "Seal"));
        // Repeated single char passes only when it matches the name's start
        assert!(is_valid_code("SSSS", "Seal"));
        assert!(!is_valid_code("QQQQ", "Seal"));
    }
}
