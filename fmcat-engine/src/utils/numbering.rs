//! Code numbering and formatting helpers shared by the pipeline stages

/// Zero-pad to at least two digits ("7" -> "07", "123" stays "123")
pub fn pad2(n: usize) -> String {
    format!("{:02}", n)
}

/// Two-character alpha code for a 1-based per-location index
///
/// 1..=26 map to "0A".."0Z"; above that two letters are derived from
/// `(n-1) / 26` and `(n-1) % 26`, giving "AA".."AZ", "BA".."ZZ".
/// `None` past "ZZ" (index 702).
pub fn alpha_code(n: usize) -> Option<String> {
    let n = n.max(1);
    if n <= 26 {
        return Some(format!("0{}", letter(n - 1)));
    }
    if n > MAX_ALPHA_INDEX {
        return None;
    }
    let high = (n - 1) / 26;
    let low = (n - 1) % 26;
    Some(format!("{}{}", letter(high - 1), letter(low)))
}

/// Highest per-location index with a two-character alpha code ("ZZ")
pub const MAX_ALPHA_INDEX: usize = 26 * 27;

/// Sequential taxonomy number for a 1-based library index
///
/// 1 -> "001", 19 -> "019", 199 -> "199"; from 1000 on, a letter for the
/// thousands (`A` = 1) followed by the zero-padded remainder.
pub fn taxonomy_number(index: usize) -> String {
    if index <= 99 {
        format!("{:03}", index)
    } else if index <= 999 {
        index.to_string()
    } else {
        let thousands = (index / 1000) as u8;
        let prefix = char::from(64u8.saturating_add(thousands));
        format!("{}{:02}", prefix, index % 1000)
    }
}

fn letter(offset: usize) -> char {
    debug_assert!(offset < 26);
    char::from(b'A' + offset as u8)
}

/// Last `n` characters of a code (the whole code if shorter)
pub fn suffix(code: &str, n: usize) -> &str {
    let len = code.chars().count();
    if len <= n {
        return code;
    }
    let start = code
        .char_indices()
        .nth(len - n)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &code[start..]
}
