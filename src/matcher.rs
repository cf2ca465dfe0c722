//! Fuzzy matching of note checkbox text to backlog task titles.
//!
//! Precedence: case-insensitive exact match, then substring containment in either
//! direction, then the best diff ratio above [`SIMILARITY_THRESHOLD`].
//! Candidates are visited in ascending id order, so ties always resolve the same way.

use std::collections::BTreeMap;

use similar::TextDiff;

/// Similarity must be strictly greater than this to count as a match.
pub const SIMILARITY_THRESHOLD: f64 = 0.70;

/// Find the backlog task id that `text` refers to.
pub fn match_title(text: &str, candidates: &BTreeMap<u64, String>) -> Option<u64> {
    let needle = text.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let lowered: Vec<(u64, String)> =
        candidates.iter().map(|(id, title)| (*id, title.trim().to_lowercase())).collect();

    if let Some((id, _)) = lowered.iter().find(|(_, title)| *title == needle) {
        return Some(*id);
    }
    if let Some((id, _)) = lowered
        .iter()
        .find(|(_, title)| !title.is_empty() && (title.contains(&needle) || needle.contains(title.as_str())))
    {
        return Some(*id);
    }

    let mut best: Option<(u64, f64)> = None;
    for (id, title) in &lowered {
        let score = similarity(&needle, title);
        let better = match best {
            None => true,
            Some((_, top)) => score > top,
        };
        if better {
            best = Some((*id, score));
        }
    }
    best.filter(|(_, score)| *score > SIMILARITY_THRESHOLD).map(|(id, _)| id)
}

/// Similarity ratio in `[0, 1]`: `2 * matches / (len(a) + len(b))`, counted in
/// characters over a minimal character diff.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    f64::from(TextDiff::from_chars(a, b).ratio())
}
