//! Deterministic local code generator
//!
//! Always produces a 4-character code that is not in the issued set.
//!
//! # Base code
//! - Exactly three letters: the letters plus "0" ("Fan" -> "FAN0")
//! - One word: first letter followed by the remaining consonants
//!   ("Impeller" -> "IMPL"); when fewer than four remain, the word's own
//!   leading letters are used instead ("Seal" -> "SEAL"), padded with 'X'
//! - Several words: initials of up to four of the longest words (kept in
//!   their original order), then further letters of those words, longest
//!   word first, until four characters are filled
//!
//! # Collisions
//! 1. Replace the last character with digits 1-9
//! 2. Replace the third character with letters A-Z
//! 3. Exhaustive search keeping the first character

use std::collections::HashSet;

const CODE_LEN: usize = 4;
const BASE36: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a code for `component` avoiding `issued`
pub fn generate(component: &str, issued: &HashSet<String>) -> String {
    let base = base_code(component);
    if !issued.contains(&base) {
        return base;
    }
    resolve_collision(&base, issued)
}

/// Collision-free variant of `base`
fn resolve_collision(base: &str, issued: &HashSet<String>) -> String {
    let chars: Vec<char> = base.chars().collect();

    for digit in '1'..='9' {
        let candidate: String = chars[..3].iter().chain(std::iter::once(&digit)).collect();
        if !issued.contains(&candidate) {
            return candidate;
        }
    }

    for letter in 'A'..='Z' {
        let candidate: String = [chars[0], chars[1], letter, chars[3]].iter().collect();
        if !issued.contains(&candidate) {
            return candidate;
        }
    }

    for a in BASE36 {
        for b in BASE36 {
            for c in BASE36 {
                let candidate: String = [chars[0], *a as char, *b as char, *c as char].iter().collect();
                if !issued.contains(&candidate) && candidate.chars().any(|ch| ch.is_ascii_alphabetic()) {
                    return candidate;
                }
            }
        }
    }

    // Every code under this first letter is taken; widen to all first letters
    for first in b'A'..=b'Z' {
        for a in BASE36 {
            for b in BASE36 {
                for c in BASE36 {
                    let candidate: String =
                        [first as char, *a as char, *b as char, *c as char].iter().collect();
                    if !issued.contains(&candidate) {
                        return candidate;
                    }
                }
            }
        }
    }

    tracing::error!(base, "Component code space exhausted");
    base.to_string()
}

/// Collision-unaware 4-character code for a component name
pub fn base_code(component: &str) -> String {
    let words: Vec<String> = component
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_uppercase())
        .collect();

    let code = match words.len() {
        0 => String::new(),
        1 => single_word(&words[0]),
        _ => multi_word(&words),
    };

    pad(code)
}

fn single_word(word: &str) -> String {
    let letters: Vec<char> = word.chars().collect();
    if letters.len() == 3 && letters.iter().all(|c| c.is_ascii_alphabetic()) {
        return format!("{}0", word);
    }

    let stripped: String = letters
        .iter()
        .enumerate()
        .filter(|(i, c)| *i == 0 || !is_vowel(**c))
        .map(|(_, c)| *c)
        .take(CODE_LEN)
        .collect();

    if stripped.len() >= CODE_LEN {
        stripped
    } else {
        letters.iter().take(CODE_LEN).collect()
    }
}

fn multi_word(words: &[String]) -> String {
    // Longest words first; ties keep their original order
    let mut by_length: Vec<usize> = (0..words.len()).collect();
    by_length.sort_by(|a, b| words[*b].len().cmp(&words[*a].len()));
    by_length.truncate(CODE_LEN);

    let mut in_order = by_length.clone();
    in_order.sort_unstable();

    let mut code: String = in_order
        .iter()
        .filter_map(|i| words[*i].chars().next())
        .collect();

    'fill: for i in &by_length {
        for c in words[*i].chars().skip(1) {
            if code.len() >= CODE_LEN {
                break 'fill;
            }
            code.push(c);
        }
    }

    code
}

fn pad(mut code: String) -> String {
    code.truncate(CODE_LEN);
    while code.len() < CODE_LEN {
        code.push('X');
    }
    code
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'A' | 'E' | 'I' | 'O' | 'U')
}
