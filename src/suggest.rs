//! Ranked near-match suggestions for misspelled identifiers.
//!
//! The similarity measure is the difflib-compatible character ratio, so
//! the cutoffs carried over from the source tool keep their meaning.

use std::cmp::Ordering;

use similar::TextDiff;

/// Candidates from `registry` scoring at least `cutoff` against
/// `identifier`, best first, at most `max_results`. Ties break
/// alphabetically so the output is stable.
pub fn suggest<'r, I>(identifier: &str, registry: I, max_results: usize, cutoff: f32) -> Vec<String>
where
    I: IntoIterator<Item = &'r str>,
{
    let mut scored: Vec<(f32, &str)> = registry
        .into_iter()
        .map(|cand| (TextDiff::from_chars(identifier, cand).ratio(), cand))
        .filter(|(ratio, _)| *ratio >= cutoff)
        .collect();
    scored.sort_by(|a, b| {
        b.0.partial_cmp(&a.0)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.1.cmp(b.1))
    });
    scored.truncate(max_results);
    scored.into_iter().map(|(_, cand)| cand.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &[&str] = &["unique", "union", "upper", "lower", "zip"];

    fn names() -> impl Iterator<Item = &'static str> {
        REGISTRY.iter().copied()
    }

    #[test]
    fn close_matches_come_back_best_first() {
        let got = suggest("uniq", names(), 2, 0.1);
        assert_eq!(got.first().map(String::as_str), Some("unique"));
        assert_eq!(got.len(), 2);
    }

    #[test]
    fn cutoff_excludes_distant_candidates() {
        let got = suggest("aaaaaaaa", names(), 5, 0.5);
        assert!(got.is_empty());
    }

    #[test]
    fn exact_members_score_highest() {
        let got = suggest("upper", names(), 1, 0.1);
        assert_eq!(got, vec!["upper".to_string()]);
    }

    #[test]
    fn max_results_truncates() {
        let got = suggest("u", names(), 1, 0.0);
        assert_eq!(got.len(), 1);
    }
}
