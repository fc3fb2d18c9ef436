// SPDX-FileCopyrightText: 2026 Recall Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tokenization helpers shared by the analyzer, extractor, and embedder.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\w[\w+#'-]*").unwrap());

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "few", "for",
    "from", "further", "had", "has", "have", "having", "he", "her", "here", "hers", "him",
    "his", "how", "i", "if", "in", "into", "is", "it", "its", "itself", "just", "me", "more",
    "most", "my", "no", "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other",
    "our", "ours", "out", "over", "own", "same", "she", "should", "so", "some", "such", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "us", "very", "was", "we", "were", "what",
    "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would", "you",
    "your", "yours",
];

/// A token with its byte offset in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub offset: usize,
}

/// Split text into word tokens, preserving case.
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    TOKEN_PATTERN
        .find_iter(text)
        .map(|m| Token {
            text: m.as_str().trim_end_matches(['\'', '-']),
            offset: m.start(),
        })
        .filter(|t| !t.text.is_empty())
        .collect()
}

pub fn is_stopword(word: &str) -> bool {
    STOPWORDS.binary_search(&word).is_ok()
}

/// Lowercased non-stopword tokens in order of appearance.
pub fn content_words(text: &str) -> Vec<String> {
    tokenize(text)
        .into_iter()
        .map(|t| t.text.to_lowercase())
        .filter(|w| !is_stopword(w))
        .collect()
}

/// Distinct lowercased non-stopword tokens.
pub fn word_set(text: &str) -> BTreeSet<String> {
    content_words(text).into_iter().collect()
}

/// |a ∩ b| / |a ∪ b|, or 0 when both are empty.
pub fn jaccard<T: Ord>(a: &BTreeSet<T>, b: &BTreeSet<T>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopwords_are_sorted_for_binary_search() {
        let mut sorted = STOPWORDS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, STOPWORDS);
    }

    #[test]
    fn tokenize_keeps_offsets_and_symbols() {
        let tokens = tokenize("Use C++ and C# in 2026.");
        let words: Vec<&str> = tokens.iter().map(|t| t.text).collect();
        assert_eq!(words, vec!["Use", "C++", "and", "C#", "in", "2026"]);
        assert_eq!(tokens[1].offset, 4);
    }

    #[test]
    fn content_words_drop_stopwords() {
        assert_eq!(
            content_words("The memory of the system"),
            vec!["memory".to_string(), "system".to_string()]
        );
    }

    #[test]
    fn jaccard_bounds() {
        let a: BTreeSet<_> = ["x", "y"].into_iter().collect();
        let b: BTreeSet<_> = ["y", "z"].into_iter().collect();
        let empty: BTreeSet<&str> = BTreeSet::new();
        assert!((jaccard(&a, &b) - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(jaccard(&a, &a), 1.0);
        assert_eq!(jaccard(&empty, &empty), 0.0);
    }
}
