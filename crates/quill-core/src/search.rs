//! Trigram similarity, following PostgreSQL's `pg_trgm`.

use std::collections::BTreeSet;

/// Minimum similarity (exclusive) for a title to count as a search hit.
pub const SEARCH_SIMILARITY_THRESHOLD: f32 = 0.1;

/// Trigrams of `text`.
///
/// Text is lower-cased and split into runs of alphanumeric characters. Each
/// word is padded with two leading spaces and one trailing space before its
/// three-character windows are collected, so short words still contribute.
pub fn trigrams(text: &str) -> BTreeSet<[char; 3]> {
    let lowered = text.to_lowercase();
    let mut set = BTreeSet::new();

    for word in lowered.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let padded: Vec<char> = "  ".chars().chain(word.chars()).chain([' ']).collect();
        for window in padded.windows(3) {
            set.insert([window[0], window[1], window[2]]);
        }
    }

    set
}

/// Shared trigrams over all distinct trigrams of both strings, in `0.0..=1.0`.
pub fn trigram_similarity(a: &str, b: &str) -> f32 {
    let left = trigrams(a);
    let right = trigrams(b);
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }

    let shared = left.intersection(&right).count();
    let union = left.len() + right.len() - shared;
    shared as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigrams_of_single_word() {
        let grams = trigrams("Cat");

        assert_eq!(grams.len(), 4);
        assert!(grams.contains(&[' ', ' ', 'c']));
        assert!(grams.contains(&[' ', 'c', 'a']));
        assert!(grams.contains(&['c', 'a', 't']));
        assert!(grams.contains(&['a', 't', ' ']));
    }

    #[test]
    fn test_misspelling_matches_title() {
        // 4 shared trigrams out of 14 distinct ones.
        let score = trigram_similarity("Django Tips", "djngo");

        assert!((score - 4.0 / 14.0).abs() < 1e-6);
        assert!(score > SEARCH_SIMILARITY_THRESHOLD);
    }

    #[test]
    fn test_identical_and_unrelated() {
        assert_eq!(trigram_similarity("word", "WORD"), 1.0);
        assert_eq!(trigram_similarity("abc", "xyz"), 0.0);
        assert_eq!(trigram_similarity("", "anything"), 0.0);
        assert_eq!(trigram_similarity("!!!", "???"), 0.0);
    }
}
