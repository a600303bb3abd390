//! Line tokenizer: splits a line into styled spans.
//!
//! A segment is split around the first search hit if there is one, otherwise
//! around the first match of the highest-priority rule that matches at all;
//! the text before and after is then split the same way. The recursion is
//! driven by an explicit stack so long lines cannot exhaust the call stack.

use tails_types::{PLAIN, SEARCH_HIGHLIGHT, StyledSpan};

use crate::filter::SearchPattern;
use crate::rules::RuleSet;

enum Work<'a> {
    /// Segment still to be split
    Split(&'a str),
    /// Finished span (tag, text)
    Emit(&'a str, &'a str),
}

/// Tokenize `text` into styled spans, in order.
///
/// Concatenating the returned span texts reproduces `text` exactly. Search
/// hits always outrank rules; empty spans are never returned.
pub fn build_spans<'a>(
    text: &'a str,
    rules: &'a RuleSet,
    search: Option<&SearchPattern>,
) -> Vec<StyledSpan<'a>> {
    let mut spans = Vec::new();
    let mut work = vec![Work::Split(text)];

    while let Some(item) = work.pop() {
        match item {
            Work::Emit(tag, text) => {
                if !text.is_empty() {
                    spans.push(StyledSpan {
                        id: spans.len(),
                        tag,
                        text,
                    });
                }
            }
            Work::Split(segment) => {
                if segment.is_empty() {
                    continue;
                }

                match split_point(segment, rules, search) {
                    Some((tag, start, end)) => {
                        // Pushed in reverse so `pre` is processed first
                        work.push(Work::Split(&segment[end..]));
                        work.push(Work::Emit(tag, &segment[start..end]));
                        work.push(Work::Split(&segment[..start]));
                    }
                    None => {
                        // Only reachable without a catch-all rule
                        work.push(Work::Emit(PLAIN, segment));
                    }
                }
            }
        }
    }

    spans
}

/// Where to split a segment and which tag the middle part gets
fn split_point<'a>(
    segment: &str,
    rules: &'a RuleSet,
    search: Option<&SearchPattern>,
) -> Option<(&'a str, usize, usize)> {
    if let Some((start, end)) = search.and_then(|s| s.find(segment)) {
        return Some((SEARCH_HIGHLIGHT, start, end));
    }

    rules
        .first_match(segment)
        .map(|(rule, start, end)| (rule.tag(), start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tails_types::RuleSpec;

    fn error_rules() -> RuleSet {
        RuleSet::new(vec![
            RuleSpec::new("ERR", "error"),
            RuleSpec::new("", "(?s).+"),
        ])
        .unwrap()
    }

    fn search(term: &str) -> Option<SearchPattern> {
        SearchPattern::new(term).unwrap()
    }

    fn pairs<'a>(spans: &[StyledSpan<'a>]) -> Vec<(&'a str, &'a str)> {
        spans.iter().map(|s| (s.tag, s.text)).collect()
    }

    fn joined(spans: &[StyledSpan<'_>]) -> String {
        spans.iter().map(|s| s.text).collect()
    }

    #[test]
    fn test_empty_text() {
        let rules = error_rules();
        assert!(build_spans("", &rules, None).is_empty());
        assert!(build_spans("", &rules, search("x").as_ref()).is_empty());
    }

    #[test]
    fn test_rule_split() {
        let rules = error_rules();
        let spans = build_spans("boot ok then error occurred", &rules, None);
        assert_eq!(
            pairs(&spans),
            vec![("", "boot ok then "), ("ERR", "error"), ("", " occurred")]
        );
    }

    #[test]
    fn test_search_overrides_rules() {
        let rules = error_rules();
        let term = search("ok");
        let spans = build_spans("system ok now", &rules, term.as_ref());
        assert_eq!(
            pairs(&spans),
            vec![("", "system "), (SEARCH_HIGHLIGHT, "ok"), ("", " now")]
        );
    }

    #[test]
    fn test_search_hit_is_never_rule_coloured() {
        let rules = error_rules();
        let term = search("ERROR");
        let spans = build_spans("an error and another error", &rules, term.as_ref());
        assert_eq!(
            pairs(&spans),
            vec![
                ("", "an "),
                (SEARCH_HIGHLIGHT, "error"),
                ("", " and another "),
                (SEARCH_HIGHLIGHT, "error"),
            ]
        );
    }

    #[test]
    fn test_flanks_still_use_rules() {
        let rules = RuleSet::builtin();
        let term = search("then");
        let spans = build_spans("ok then error", &rules, term.as_ref());
        assert_eq!(
            pairs(&spans),
            vec![
                ("success", "ok"),
                ("", " "),
                (SEARCH_HIGHLIGHT, "then"),
                ("", " "),
                ("error", "error"),
            ]
        );
    }

    #[test]
    fn test_search_keeps_original_case() {
        let rules = error_rules();
        let term = search("ok");
        let spans = build_spans("System OK", &rules, term.as_ref());
        assert_eq!(pairs(&spans), vec![("", "System "), (SEARCH_HIGHLIGHT, "OK")]);
    }

    #[test]
    fn test_missing_search_term_falls_back_to_rules() {
        let rules = error_rules();
        let term = search("absent");
        let spans = build_spans("error", &rules, term.as_ref());
        assert_eq!(pairs(&spans), vec![("ERR", "error")]);
    }

    #[test]
    fn test_lower_priority_earlier_match_loses() {
        let rules = RuleSet::new(vec![
            RuleSpec::new("ERR", "error"),
            RuleSpec::new("OK", "ok"),
            RuleSpec::new("", "(?s).+"),
        ])
        .unwrap();

        let spans = build_spans("ok error", &rules, None);
        assert_eq!(pairs(&spans), vec![("OK", "ok"), ("", " "), ("ERR", "error")]);
    }

    #[test]
    fn test_span_ids_are_sequential() {
        let rules = RuleSet::builtin();
        let spans = build_spans("2024-01-02 10:11:12 warning: disk issue", &rules, None);
        for (index, span) in spans.iter().enumerate() {
            assert_eq!(span.id, index);
            assert!(!span.text.is_empty());
        }
    }

    #[test]
    fn test_lossless_partition() {
        let rules = RuleSet::builtin();
        let inputs = [
            "plain text",
            "2024-01-02 10:11:12 INFO starting worker on 192.168.1.20",
            "\tWARNING: retry\tfailed with issue #4",
            "ünïcödé error → 日志 ok",
            "multi\nline\r\nerror",
            "   ",
            "!FORCE_SHUTDOWN!",
        ];
        let terms = ["", "o", "ERR", "日志", " ", "\t", "no-such-term"];

        for input in inputs {
            for term in terms {
                let pattern = search(term);
                let spans = build_spans(input, &rules, pattern.as_ref());
                assert_eq!(joined(&spans), input, "input {:?} term {:?}", input, term);
                assert!(spans.iter().all(|s| !s.text.is_empty()));
            }
        }
    }

    #[test]
    fn test_long_line_does_not_recurse() {
        let rules = RuleSet::builtin();
        let line = "error ok ".repeat(2_000);
        let spans = build_spans(&line, &rules, None);
        assert_eq!(spans.len(), 8_000);
        assert_eq!(joined(&spans), line);
    }
}
