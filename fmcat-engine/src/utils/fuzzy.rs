//! Fuzzy string search
//!
//! Scores are distances: 0.0 = identical, 1.0 = unrelated. Built on
//! `strsim::normalized_levenshtein` over normalized text (lowercase,
//! trimmed, internal whitespace collapsed).

use std::collections::HashMap;

/// One ranked hit, best key per owner
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    /// Caller-defined owner index (library entry, lexicon row, ...)
    pub owner: usize,
    /// The key string that produced the best score for this owner
    pub key: String,
    /// Distance in [0.0, 1.0]
    pub score: f64,
}

impl FuzzyMatch {
    /// Similarity in [0.0, 1.0] (1.0 = identical)
    pub fn similarity(&self) -> f64 {
        1.0 - self.score
    }
}

/// Normalize text for comparison
pub fn normalize(s: &str) -> String {
    s.split_whitespace()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Distance between two strings after normalization
pub fn distance(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    1.0 - strsim::normalized_levenshtein(&a, &b)
}

/// Rank owners by their closest key to `query`
///
/// Every owner appears at most once (its best key). Results are sorted by
/// ascending distance, ties broken by owner index so output is stable.
pub fn rank<'a, I>(query: &str, keys: I) -> Vec<FuzzyMatch>
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    let mut best: Vec<FuzzyMatch> = Vec::new();
    // owner -> position in `best`
    let mut slots: HashMap<usize, usize> = HashMap::new();

    for (owner, key) in keys {
        let score = distance(query, key);
        match slots.get(&owner) {
            Some(&slot) => {
                let existing = &mut best[slot];
                if score < existing.score {
                    existing.key = key.to_string();
                    existing.score = score;
                }
            }
            None => {
                slots.insert(owner, best.len());
                best.push(FuzzyMatch {
                    owner,
                    key: key.to_string(),
                    score,
                });
            }
        }
    }

    best.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.owner.cmp(&b.owner))
    });
    best
}
