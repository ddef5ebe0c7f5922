// src/overlap.rs
//! Duplicate-match resolution.
//!
//! "i like etherium" can trigger both `eth` and `ethereum`; highlighting both
//! would nest markup. Two matches conflict when they share a `start` or an
//! `end` offset, and the longer span survives. Matches that overlap without
//! sharing a boundary are left alone.

use crate::matcher::{Match, MatchSet};
use tracing::debug;

/// True if `a` and `b` share a start or an end offset.
#[inline]
pub fn conflicts(a: &Match, b: &Match) -> bool {
    a.start == b.start || a.end == b.end
}

/// First conflicting pair (by index) in `matches`, if any.
pub fn find_conflict(matches: &[Match]) -> Option<(usize, usize)> {
    (0..matches.len())
        .flat_map(|i| (i + 1..matches.len()).map(move |j| (i, j)))
        .find(|&(i, j)| conflicts(&matches[i], &matches[j]))
}

/// True if no two matches conflict.
pub fn is_resolved(matches: &[Match]) -> bool {
    find_conflict(matches).is_none()
}

/// Remove conflicting matches, keeping the longer span of every conflict.
///
/// Candidates are ranked once (longer span first, then earlier position in
/// the input, which is keyword-list order). Walking that ranking, a match
/// survives only if it conflicts with no survivor chosen before it, so a
/// match knocked out early can no longer eliminate anything. Survivors are
/// returned in their original order.
pub fn resolve(matches: MatchSet) -> MatchSet {
    if matches.len() < 2 {
        return matches;
    }

    let mut ranking: Vec<usize> = (0..matches.len()).collect();
    ranking.sort_by(|&a, &b| {
        matches[b]
            .span_len()
            .cmp(&matches[a].span_len())
            .then(a.cmp(&b))
    });

    let mut winners: Vec<usize> = Vec::with_capacity(matches.len());
    for idx in ranking {
        let loser_to = winners
            .iter()
            .copied()
            .find(|&w| conflicts(&matches[w], &matches[idx]));
        match loser_to {
            Some(w) => debug!(
                target: "overlap",
                kept = %matches[w].keyword,
                dropped = %matches[idx].keyword,
                "conflicting matches"
            ),
            None => winners.push(idx),
        }
    }

    let mut keep = vec![false; matches.len()];
    for w in winners {
        keep[w] = true;
    }
    matches
        .into_iter()
        .zip(keep)
        .filter_map(|(m, k)| k.then_some(m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn m(keyword: &str, start: usize, end: usize) -> Match {
        Match {
            keyword: keyword.to_string(),
            matched_text: keyword.to_string(),
            start,
            end,
            distance: 0,
        }
    }

    fn keywords(ms: &[Match]) -> Vec<&str> {
        ms.iter().map(|m| m.keyword.as_str()).collect()
    }

    #[test]
    fn shared_start_keeps_longer() {
        let out = resolve(vec![m("eth", 10, 13), m("ethereum", 10, 18)]);
        assert_eq!(out, vec![m("ethereum", 10, 18)]);
    }

    #[test]
    fn shared_end_keeps_longer() {
        let out = resolve(vec![m("bitcoin", 4, 11), m("coin", 7, 11)]);
        assert_eq!(keywords(&out), vec!["bitcoin"]);
    }

    #[test]
    fn equal_spans_keep_earlier_keyword() {
        let out = resolve(vec![m("alpha", 0, 5), m("bravo", 0, 5)]);
        assert_eq!(keywords(&out), vec!["alpha"]);
        let out = resolve(vec![m("bravo", 0, 5), m("alpha", 0, 5)]);
        assert_eq!(keywords(&out), vec!["bravo"]);
    }

    #[test]
    fn chained_conflicts_are_resolved_against_survivors() {
        // a beats b (shared start); b would beat c (shared end) but b is gone,
        // and c shares no boundary with a.
        let a = m("a", 0, 10);
        let b = m("b", 0, 5);
        let c = m("c", 3, 5);
        let out = resolve(vec![c.clone(), b, a.clone()]);
        assert_eq!(out, vec![c, a]);
        assert!(is_resolved(&out));
    }

    #[test]
    fn partial_overlap_is_not_a_conflict() {
        let input = vec![m("left", 0, 6), m("right", 3, 9)];
        let out = resolve(input.clone());
        assert_eq!(out, input);
    }

    #[test]
    fn many_matches_on_one_start() {
        let out = resolve(vec![
            m("e", 2, 3),
            m("eth", 2, 5),
            m("ethe", 2, 6),
            m("ethereum", 2, 10),
            m("other", 20, 25),
        ]);
        assert_eq!(keywords(&out), vec!["ethereum", "other"]);
    }

    #[test]
    fn survivors_never_share_boundaries() {
        let input = vec![
            m("k0", 0, 4),
            m("k1", 0, 7),
            m("k2", 3, 7),
            m("k3", 5, 9),
            m("k4", 5, 12),
            m("k5", 8, 12),
            m("k6", 15, 16),
        ];
        let out = resolve(input);
        assert!(is_resolved(&out));
        assert_eq!(keywords(&out), vec!["k1", "k4", "k6"]);
    }

    #[test]
    fn find_conflict_reports_first_pair() {
        assert_eq!(find_conflict(&[m("a", 0, 3), m("b", 5, 8)]), None);
        assert_eq!(
            find_conflict(&[m("a", 0, 3), m("b", 5, 8), m("c", 1, 8)]),
            Some((1, 2))
        );
    }
}
