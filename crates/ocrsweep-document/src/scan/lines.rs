// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reading-order line reconstruction from word-level recognition output.
//
// Concatenating a word stream as the engine emits it garbles multi-column
// and tabular pages. Grouping words by their (block, paragraph, line) key
// and sorting each group left to right recovers the row structure.

use std::collections::BTreeMap;

use ocrsweep_core::{GroupKey, WordToken};

/// Rebuild ordered text lines from recognised words.
///
/// Words with blank text are dropped, as are words whose known confidence is
/// below `min_confidence`; words without a confidence are always kept. Each
/// remaining group becomes one line, words joined by single spaces in
/// ascending `left` order, lines ordered by group key.
pub fn reconstruct_lines(tokens: &[WordToken], min_confidence: u8) -> Vec<String> {
    let mut groups: BTreeMap<GroupKey, Vec<(u32, &str)>> = BTreeMap::new();

    for token in tokens {
        if !token.has_text() || token.confidence.is_some_and(|conf| conf < min_confidence) {
            continue;
        }
        groups
            .entry(token.group)
            .or_default()
            .push((token.left, token.text.trim()));
    }

    groups
        .into_values()
        .map(|mut words| {
            // Stable: words sharing a `left` keep engine order.
            words.sort_by_key(|(left, _)| *left);
            words
                .iter()
                .map(|(_, text)| *text)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// [`reconstruct_lines`] joined with newlines. Empty when nothing survives.
pub fn reconstruct(tokens: &[WordToken], min_confidence: u8) -> String {
    reconstruct_lines(tokens, min_confidence).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, conf: Option<u8>, left: u32, key: (u32, u32, u32)) -> WordToken {
        WordToken::new(text, conf, left, GroupKey::new(key.0, key.1, key.2))
    }

    #[test]
    fn groups_rows_and_orders_words() {
        let tokens = vec![
            word("Alice", Some(90), 10, (0, 0, 0)),
            word("30", Some(90), 120, (0, 0, 0)),
            word("Bob", Some(90), 10, (0, 0, 1)),
        ];
        assert_eq!(reconstruct(&tokens, 0), "Alice 30\nBob");
    }

    #[test]
    fn words_are_sorted_by_left_within_a_line() {
        let tokens = vec![
            word("third", None, 300, (1, 0, 0)),
            word("first", None, 5, (1, 0, 0)),
            word("second", None, 150, (1, 0, 0)),
        ];
        assert_eq!(reconstruct(&tokens, 0), "first second third");
    }

    #[test]
    fn lines_follow_block_paragraph_line_order() {
        let tokens = vec![
            word("c", None, 0, (2, 0, 0)),
            word("b", None, 0, (1, 1, 0)),
            word("a2", None, 0, (1, 0, 3)),
            word("a1", None, 0, (1, 0, 1)),
        ];
        assert_eq!(reconstruct_lines(&tokens, 0), vec!["a1", "a2", "b", "c"]);
    }

    #[test]
    fn blank_tokens_never_create_lines() {
        let tokens = vec![
            word("  ", Some(99), 0, (0, 0, 0)),
            word("", None, 0, (0, 0, 1)),
            word("kept", Some(99), 0, (0, 0, 2)),
            word("\t", Some(99), 10, (0, 0, 2)),
        ];
        let lines = reconstruct_lines(&tokens, 0);
        assert_eq!(lines, vec!["kept"]);
    }

    #[test]
    fn low_confidence_is_dropped_but_unknown_is_kept() {
        let tokens = vec![
            word("weak", Some(20), 0, (0, 0, 0)),
            word("strong", Some(35), 50, (0, 0, 0)),
            word("unknown", None, 100, (0, 0, 0)),
        ];
        assert_eq!(reconstruct(&tokens, 35), "strong unknown");
    }

    #[test]
    fn nothing_surviving_gives_empty_string() {
        let tokens = vec![word("noise", Some(3), 0, (0, 0, 0))];
        assert_eq!(reconstruct(&tokens, 50), "");
        assert_eq!(reconstruct(&[], 0), "");
    }

    #[test]
    fn line_count_equals_distinct_surviving_keys() {
        let tokens = vec![
            word("a", None, 0, (0, 0, 0)),
            word("b", None, 9, (0, 0, 0)),
            word("c", None, 0, (0, 1, 0)),
            word(" ", None, 0, (0, 2, 0)),
            word("d", Some(1), 0, (0, 3, 0)),
            word("e", None, 0, (4, 0, 0)),
        ];
        let out = reconstruct(&tokens, 10);
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed_from_words() {
        let tokens = vec![word(" total ", None, 0, (0, 0, 0)), word("42\n", None, 40, (0, 0, 0))];
        assert_eq!(reconstruct(&tokens, 0), "total 42");
    }
}
