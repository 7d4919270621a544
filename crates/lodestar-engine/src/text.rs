//! Shared lexical helpers: tokenization and set similarity.
//!
//! Both relevance scoring and the benchmark-clone check are lexical and
//! deterministic; they share one tokenizer so thresholds stay comparable.

use std::collections::HashSet;

/// Words too common to carry signal in short titles/summaries.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "over", "are", "was", "were",
    "will", "would", "could", "should", "has", "have", "had", "not", "but", "its", "their", "via",
    "per", "them", "they", "than", "then", "when", "where", "which", "while", "about", "after",
    "before", "between", "through", "under", "more", "most", "some", "such", "can", "may", "all",
    "each", "other", "new", "one", "two", "also", "been", "being", "both", "out", "own", "same",
    "how", "what", "who", "why",
];

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

/// Lowercase alphanumeric tokens, stopwords removed, length >= 3.
pub(crate) fn tokenize(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| w.len() >= 3 && !is_stopword(w))
        .map(str::to_string)
        .collect()
}

/// |a ∩ b| / |a ∪ b|, 0.0 when both are empty.
pub(crate) fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Fraction of `needle` tokens present in `haystack`, 0.0 when empty.
pub(crate) fn containment(needle: &HashSet<String>, haystack: &HashSet<String>) -> f64 {
    if needle.is_empty() {
        return 0.0;
    }
    needle.iter().filter(|t| haystack.contains(*t)).count() as f64 / needle.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_stopwords_and_short_words() {
        let tokens = tokenize("The cost of a net for malaria");
        assert!(tokens.contains("cost"));
        assert!(tokens.contains("net"));
        assert!(tokens.contains("malaria"));
        assert!(!tokens.contains("the"));
        assert!(!tokens.contains("of"));
    }

    #[test]
    fn jaccard_of_identical_sets_is_one() {
        let a = tokenize("broiler welfare commitments");
        assert!((jaccard(&a, &a) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn containment_is_directional() {
        let small = tokenize("givewell charities");
        let big = tokenize("fund the givewell top charities fund directly");
        assert!((containment(&small, &big) - 1.0).abs() < f64::EPSILON);
        assert!(containment(&big, &small) < 1.0);
    }
}
