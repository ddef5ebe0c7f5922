// src/annotate.rs
//! Discord-markdown highlighting of resolved matches.
//!
//! Markers are inserted at the offsets recorded by the matcher, never by
//! searching the text again: the same word can appear several times and only
//! the matched occurrence may be wrapped.
//!
//! All insertion points are collected against the unmodified text and the
//! output is built in one left-to-right pass. This gives the same result as
//! inserting right-to-left (end marker first) but also stays correct when
//! spans interleave, because no offset is ever read from a shifted string.
//!
//! A match that already sits between its own style's markers is left alone,
//! so annotating an annotated text changes nothing.

use crate::matcher::Match;
use crate::overlap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::{debug, error};

/// Highlight style for one annotation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Style {
    /// Bold + underline, used for definite matches.
    Strong,
    /// Underline only, used for possible matches.
    Weak,
}

impl Style {
    pub fn open(self) -> &'static str {
        match self {
            Style::Strong => "__**",
            Style::Weak => "__",
        }
    }

    pub fn close(self) -> &'static str {
        match self {
            Style::Strong => "**__",
            Style::Weak => "__",
        }
    }
}

/// Wrap every match of `matches` in `style` markers.
///
/// Returns `text` unchanged when `matches` is empty.
pub fn annotate(text: &str, matches: &[Match], style: Style) -> String {
    render(text, &[(matches, style)])
}

/// Strong pass for `definite`, weak pass for `possible`, both against `text`.
///
/// A possible match that intersects any definite span is dropped so the two
/// passes never nest inside each other.
pub fn compose(text: &str, definite: &[Match], possible: &[Match]) -> String {
    let weak = suppress_shadowed(possible, definite);
    render(text, &[(definite, Style::Strong), (&weak, Style::Weak)])
}

/// `weak` minus every match that intersects a match of `strong`.
pub fn suppress_shadowed(weak: &[Match], strong: &[Match]) -> Vec<Match> {
    weak.iter()
        .filter(|w| !strong.iter().any(|s| intersects(s, w)))
        .cloned()
        .collect()
}

#[inline]
fn intersects(a: &Match, b: &Match) -> bool {
    a.start < b.end && b.start < a.end
}

#[derive(Debug)]
struct Insertion {
    at: usize,
    closing: bool,
    span: usize,
    marker: &'static str,
}

fn insertion_order(a: &Insertion, b: &Insertion) -> Ordering {
    a.at.cmp(&b.at)
        // close before open at the same offset: `a]` then `[b`
        .then(b.closing.cmp(&a.closing))
        .then(if a.closing {
            // inner span closes first
            a.span.cmp(&b.span)
        } else {
            // outer span opens first
            b.span.cmp(&a.span)
        })
}

fn offsets_valid(text: &str, m: &Match) -> bool {
    m.start <= m.end
        && m.end <= text.len()
        && text.is_char_boundary(m.start)
        && text.is_char_boundary(m.end)
}

/// `m` is already enclosed by `style` markers in `text`.
fn already_wrapped(text: &str, m: &Match, style: Style) -> bool {
    text[..m.start].ends_with(style.open()) && text[m.end..].starts_with(style.close())
}

fn render(text: &str, layers: &[(&[Match], Style)]) -> String {
    let mut inserts: Vec<Insertion> = Vec::new();

    for &(matches, style) in layers {
        let conflict = overlap::find_conflict(matches);
        if let Some((i, j)) = conflict {
            error!(
                target: "annotate",
                first = %matches[i].keyword,
                second = %matches[j].keyword,
                "unresolved match set: shared boundary"
            );
        }
        debug_assert!(conflict.is_none(), "annotate called with an unresolved match set");

        for m in matches {
            let valid = offsets_valid(text, m);
            debug_assert!(valid, "match offsets out of range for `{}`", m.keyword);
            if !valid {
                error!(
                    target: "annotate",
                    keyword = %m.keyword,
                    start = m.start,
                    end = m.end,
                    len = text.len(),
                    "match offsets do not fit the text; skipped"
                );
                continue;
            }
            if already_wrapped(text, m, style) {
                debug!(target: "annotate", keyword = %m.keyword, "span already highlighted");
                continue;
            }
            let span = m.span_len();
            inserts.push(Insertion {
                at: m.start,
                closing: false,
                span,
                marker: style.open(),
            });
            inserts.push(Insertion {
                at: m.end,
                closing: true,
                span,
                marker: style.close(),
            });
        }
    }

    if inserts.is_empty() {
        return text.to_string();
    }
    inserts.sort_by(insertion_order);

    let extra: usize = inserts.iter().map(|i| i.marker.len()).sum();
    let mut out = String::with_capacity(text.len() + extra);
    let mut cursor = 0usize;
    for ins in &inserts {
        out.push_str(&text[cursor..ins.at]);
        out.push_str(ins.marker);
        cursor = ins.at;
    }
    out.push_str(&text[cursor..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(text: &str, needle: &str, nth: usize) -> Match {
        let start = text
            .match_indices(needle)
            .nth(nth)
            .map(|(i, _)| i)
            .expect("needle present");
        Match {
            keyword: needle.to_string(),
            matched_text: needle.to_string(),
            start,
            end: start + needle.len(),
            distance: 0,
        }
    }

    #[test]
    fn empty_set_returns_input() {
        assert_eq!(annotate("nothing here", &[], Style::Strong), "nothing here");
    }

    #[test]
    fn strong_and_weak_markers() {
        let text = "buy bitcoin now";
        let m = at(text, "bitcoin", 0);
        assert_eq!(
            annotate(text, &[m.clone()], Style::Strong),
            "buy __**bitcoin**__ now"
        );
        assert_eq!(annotate(text, &[m], Style::Weak), "buy __bitcoin__ now");
    }

    #[test]
    fn uses_recorded_offsets_not_first_occurrence() {
        let text = "coin talk: bitcoin is not a coin";
        let second = at(text, "coin", 2);
        assert_eq!(
            annotate(text, &[second], Style::Weak),
            "coin talk: bitcoin is not a __coin__"
        );
    }

    #[test]
    fn later_spans_are_not_shifted_by_earlier_ones() {
        let text = "doge then crypto then bitcoin";
        let ms = vec![at(text, "bitcoin", 0), at(text, "doge", 0), at(text, "crypto", 0)];
        assert_eq!(
            annotate(text, &ms, Style::Weak),
            "__doge__ then __crypto__ then __bitcoin__"
        );
    }

    #[test]
    fn adjacent_spans_close_before_open() {
        let text = "bitcoindoge";
        let ms = vec![at(text, "bitcoin", 0), at(text, "doge", 0)];
        assert_eq!(
            annotate(text, &ms, Style::Weak),
            "__bitcoin____doge__"
        );
    }

    #[test]
    fn compose_drops_possible_inside_definite() {
        let text = "ethereum and doge";
        let definite = vec![at(text, "ethereum", 0)];
        let possible = vec![at(text, "eth", 0), at(text, "doge", 0)];
        assert_eq!(
            compose(text, &definite, &possible),
            "__**ethereum**__ and __doge__"
        );
    }

    #[test]
    fn annotating_twice_is_a_no_op() {
        let text = "i hold __**bitcoi**__ and __doge__";
        let strong = at(text, "bitcoi", 0);
        let weak = at(text, "doge", 0);
        assert_eq!(annotate(text, &[strong.clone()], Style::Strong), text);
        assert_eq!(compose(text, &[strong.clone()], &[weak]), text);
        // a different style still wraps
        assert_eq!(
            annotate(text, &[strong], Style::Weak),
            "i hold __**__bitcoi__**__ and __doge__"
        );
    }

    #[test]
    fn multibyte_text_is_preserved() {
        let text = "café ☕ bitcoin 🚀";
        let m = at(text, "bitcoin", 0);
        assert_eq!(annotate(text, &[m], Style::Strong), "café ☕ __**bitcoin**__ 🚀");
    }
}
