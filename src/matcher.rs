// src/matcher.rs
//! Approximate keyword scanning.
//!
//! Every keyword is searched independently inside an already-lowercased text.
//! Short keywords (see [`EditPolicy`]) must occur verbatim; longer ones may be
//! one insertion, deletion or substitution away. Only the first occurrence of
//! each keyword is reported.
//!
//! Offsets are byte offsets into the scanned `&str` and always sit on
//! character boundaries, so `&text[m.start..m.end] == m.matched_text`.
//! Edit distance is counted in characters (`strsim::levenshtein`).

use serde::{Deserialize, Serialize};
use std::iter;
use strsim::levenshtein;
use tracing::debug;

/// One keyword found (approximately) inside a text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub keyword: String,
    pub matched_text: String,
    pub start: usize,
    pub end: usize,
    pub distance: usize,
}

impl Match {
    /// Span length in bytes (`end - start`).
    #[inline]
    pub fn span_len(&self) -> usize {
        self.end - self.start
    }
}

/// Matches for one keyword list over one text, in keyword-list order.
pub type MatchSet = Vec<Match>;

fn default_exact_max_len() -> usize {
    4
}
fn default_max_distance() -> usize {
    1
}

/// Length-based edit tolerance.
///
/// Keywords of at most `exact_max_len` characters match exactly; longer
/// keywords tolerate up to `max_distance` edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPolicy {
    #[serde(default = "default_exact_max_len")]
    pub exact_max_len: usize,
    #[serde(default = "default_max_distance")]
    pub max_distance: usize,
}

impl Default for EditPolicy {
    fn default() -> Self {
        Self {
            exact_max_len: default_exact_max_len(),
            max_distance: default_max_distance(),
        }
    }
}

impl EditPolicy {
    /// Allowed edits for `keyword`.
    pub fn max_edits(&self, keyword: &str) -> usize {
        if keyword.chars().count() <= self.exact_max_len {
            0
        } else {
            self.max_distance
        }
    }
}

/// Scan `text` for every keyword, keeping at most one match per keyword.
pub fn scan<S: AsRef<str>>(keywords: &[S], text: &str, policy: EditPolicy) -> MatchSet {
    let out: MatchSet = keywords
        .iter()
        .filter_map(|kw| {
            let kw = kw.as_ref();
            find_first(kw, text, policy.max_edits(kw))
        })
        .collect();

    debug!(
        target: "matcher",
        keywords = keywords.len(),
        hits = out.len(),
        "scan finished"
    );
    out
}

/// Find the first occurrence of `keyword` within `max_edits` edits.
pub fn find_first(keyword: &str, text: &str, max_edits: usize) -> Option<Match> {
    if keyword.is_empty() || text.is_empty() {
        return None;
    }
    if max_edits == 0 {
        return text.find(keyword).map(|start| Match {
            keyword: keyword.to_string(),
            matched_text: keyword.to_string(),
            start,
            end: start + keyword.len(),
            distance: 0,
        });
    }
    find_first_approx(keyword, text, max_edits)
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    start: usize, // char index
    end: usize,   // char index, exclusive
    distance: usize,
    /// |window length - keyword length| in chars
    gap: usize,
}

impl Candidate {
    /// Lower distance wins, then the length closest to the keyword, then the
    /// shorter window. Earlier start wins ties because candidates arrive in
    /// start order and only strict improvements replace.
    fn beats(&self, other: &Candidate) -> bool {
        self.rank() < other.rank()
    }

    fn rank(&self) -> (usize, usize, usize) {
        (self.distance, self.gap, self.end - self.start)
    }
}

/// Edge and whitespace shape of a keyword. A window may not start or end on a
/// non-alphanumeric char where the keyword has an alphanumeric one, and may
/// not contain more whitespace than the keyword. This keeps neighbouring
/// words, punctuation and highlight markup out of the reported span.
#[derive(Debug, Clone, Copy)]
struct Shape {
    starts_alnum: bool,
    ends_alnum: bool,
    whitespace: usize,
}

impl Shape {
    fn of(keyword: &str) -> Self {
        Self {
            starts_alnum: keyword.chars().next().is_some_and(char::is_alphanumeric),
            ends_alnum: keyword.chars().next_back().is_some_and(char::is_alphanumeric),
            whitespace: keyword.chars().filter(|c| c.is_whitespace()).count(),
        }
    }

    fn admits(&self, window: &[char]) -> bool {
        let (Some(first), Some(last)) = (window.first(), window.last()) else {
            return false;
        };
        (!self.starts_alnum || first.is_alphanumeric())
            && (!self.ends_alnum || last.is_alphanumeric())
            && window.iter().filter(|c| c.is_whitespace()).count() <= self.whitespace
    }
}

/// Sliding-window search: every window of `len(keyword) ± k` characters is
/// compared against the keyword. Overlapping hits form one cluster; the first
/// cluster's best hit is the reported match.
fn find_first_approx(keyword: &str, text: &str, k: usize) -> Option<Match> {
    // bounds[i] = byte offset of char i; last entry = text.len()
    let bounds: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(iter::once(text.len()))
        .collect();
    let chars: Vec<char> = text.chars().collect();
    let n_chars = chars.len();

    let kw_chars = keyword.chars().count();
    let min_len = kw_chars.saturating_sub(k).max(1);
    let max_len = kw_chars + k;
    let shape = Shape::of(keyword);

    let mut best: Option<Candidate> = None;
    let mut cluster_end = 0usize;

    for s in 0..n_chars {
        // A window starting past the cluster cannot overlap it: the first cluster is closed.
        if best.is_some() && s >= cluster_end {
            break;
        }
        for len in min_len..=max_len {
            let e = s + len;
            if e > n_chars {
                break;
            }
            if !shape.admits(&chars[s..e]) {
                continue;
            }
            let distance = levenshtein(&text[bounds[s]..bounds[e]], keyword);
            if distance > k {
                continue;
            }
            let cand = Candidate {
                start: s,
                end: e,
                distance,
                gap: len.abs_diff(kw_chars),
            };
            cluster_end = cluster_end.max(e);
            match &best {
                Some(b) if !cand.beats(b) => {}
                _ => best = Some(cand),
            }
        }
    }

    best.map(|c| {
        let (start, end) = (bounds[c.start], bounds[c.end]);
        Match {
            keyword: keyword.to_string(),
            matched_text: text[start..end].to_string(),
            start,
            end,
            distance: c.distance,
        }
    })
}

/// Drop whitespace-delimited `@handle` tokens and rejoin the rest with single spaces.
///
/// Offsets produced by scanning the result refer to the stripped text.
pub fn strip_mentions(text: &str) -> String {
    text.split_whitespace()
        .filter(|tok| !tok.starts_with('@'))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> EditPolicy {
        EditPolicy::default()
    }

    #[test]
    fn exact_long_keyword_reports_bare_word() {
        let text = "i am a tweet containing a bitcoin reference";
        let m = find_first("bitcoin", text, 1).expect("match");
        assert_eq!(m.matched_text, "bitcoin");
        assert_eq!(m.distance, 0);
        assert_eq!(&text[m.start..m.end], "bitcoin");
        assert_eq!(m.start, 26);
    }

    #[test]
    fn one_substitution_is_tolerated() {
        let text = "i refer to etherium";
        let m = find_first("ethereum", text, 1).expect("match");
        assert_eq!(m.matched_text, "etherium");
        assert_eq!(m.distance, 1);
        assert_eq!((m.start, m.end), (11, 19));
    }

    #[test]
    fn one_deletion_and_one_insertion_are_tolerated() {
        let m = find_first("bitcoin", "buy bitcon now", 1).expect("deletion");
        assert_eq!(m.matched_text, "bitcon");
        assert_eq!(m.distance, 1);

        let m = find_first("bitcoin", "buy bittcoin now", 1).expect("insertion");
        assert_eq!(m.matched_text, "bittcoin");
        assert_eq!(m.distance, 1);
    }

    #[test]
    fn missing_last_letter_does_not_swallow_the_next_word() {
        let m = find_first("bitcoin", "buy bitcoi now", 1).expect("match");
        assert_eq!(m.matched_text, "bitcoi");
        assert_eq!((m.start, m.end), (4, 10));

        let m = find_first("bitcoin", "i hold bitcoi", 1).expect("match at end");
        assert_eq!(m.matched_text, "bitcoi");
    }

    #[test]
    fn markup_and_punctuation_stay_outside_the_span() {
        let text = "i hold __**bitcoi**__";
        let m = find_first("bitcoin", text, 1).expect("match");
        assert_eq!(m.matched_text, "bitcoi");
        assert_eq!(&text[m.start..m.end], "bitcoi");

        let m = find_first("ethereum", "(etherum)", 1).expect("match");
        assert_eq!(m.matched_text, "etherum");
    }

    #[test]
    fn equal_distance_prefers_keyword_length() {
        // "bitcoix" (substitution) and "bitcoi" (deletion) are both one edit away
        let m = find_first("bitcoin", "bitcoix", 1).expect("match");
        assert_eq!(m.matched_text, "bitcoix");
    }

    #[test]
    fn multi_word_keywords_may_span_whitespace() {
        let m = find_first("to the moon", "going to the mon", 1).expect("match");
        assert_eq!(m.matched_text, "to the mon");
        assert_eq!(m.distance, 1);
    }

    #[test]
    fn two_edits_are_rejected() {
        assert!(find_first("ethereum", "i refer to etherium!", 1).is_some());
        // two substitutions
        assert!(find_first("ethereum", "i refer to etharium", 1).is_none());
    }

    #[test]
    fn short_keywords_match_exactly_only() {
        let policy = p();
        assert_eq!(policy.max_edits("doge"), 0);
        assert_eq!(policy.max_edits("crypto"), 1);

        let hits = scan(&["doge"], "i wish to take my dog to the moon today", policy);
        assert!(hits.is_empty(), "one-edit variant of a short keyword must not match");

        let hits = scan(&["doge"], "much doge wow", policy);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance, 0);
    }

    #[test]
    fn only_first_occurrence_is_reported() {
        let text = "bitcoin and more bitcoin";
        let hits = scan(&["bitcoin"], text, p());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].start, 0);
    }

    #[test]
    fn output_follows_keyword_order() {
        let text = "crypto first, bitcoin second";
        let hits = scan(&["bitcoin", "crypto"], text, p());
        let kws: Vec<_> = hits.iter().map(|m| m.keyword.as_str()).collect();
        assert_eq!(kws, vec!["bitcoin", "crypto"]);
    }

    #[test]
    fn empty_inputs_yield_empty_sets() {
        let none: [&str; 0] = [];
        assert!(scan(&none, "bitcoin", p()).is_empty());
        assert!(scan(&["bitcoin"], "", p()).is_empty());
        assert!(scan(&[""], "bitcoin", p()).is_empty());
    }

    #[test]
    fn offsets_stay_on_char_boundaries() {
        let text = "žluťoučký kůň koupil ethereum";
        let m = find_first("ethereum", text, 1).expect("match");
        assert_eq!(&text[m.start..m.end], "ethereum");
        assert_eq!(m.distance, 0);

        let m = find_first("kůňě", "a kůňě b", 0).expect("exact");
        assert_eq!(&"a kůňě b"[m.start..m.end], "kůňě");
    }

    #[test]
    fn mentions_are_stripped() {
        assert_eq!(
            strip_mentions("@anotherbitcoinperson actually talking about bitcoin"),
            "actually talking about bitcoin"
        );
        assert_eq!(strip_mentions("@personwithbitcoinintheirhandle"), "");
        assert_eq!(strip_mentions("mail me a@b.c"), "mail me a@b.c");
    }
}
