//! Vocabularies: the set of lowercased words an encoder keeps vectors for.

use std::collections::BTreeSet;

use crate::conllu::Treebank;
use crate::parser::Tokenizer;

/// A sorted, duplicate-free list of lowercased words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    words: Vec<String>,
}

impl Vocabulary {
    /// Collect the words of any iterator, lowercased and deduplicated.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = words
            .into_iter()
            .map(|w| w.as_ref().to_lowercase())
            .collect();
        Self {
            words: set.into_iter().collect(),
        }
    }

    /// Collect the words of `sentences` as split by `tokenizer`.
    pub fn from_sentences<I, S>(tokenizer: &dyn Tokenizer, sentences: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_words(
            sentences
                .into_iter()
                .flat_map(|s| tokenizer.tokenize(s.as_ref())),
        )
    }

    /// Every word form in a treebank.
    pub fn from_treebank(treebank: &Treebank) -> Self {
        Self::from_words(treebank.parses().flat_map(|tokens| tokens.iter().map(|t| t.lower.as_str())))
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.binary_search_by(|w| w.as_str().cmp(word)).is_ok()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.words
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::WhitespaceTokenizer;

    #[test]
    fn test_from_sentences_lowercases_and_dedups() {
        let vocab = Vocabulary::from_sentences(
            &WhitespaceTokenizer,
            ["The cat sat.", "the dog sat"],
        );
        assert_eq!(vocab.as_slice(), &[".", "cat", "dog", "sat", "the"]);
        assert!(vocab.contains("dog"));
        assert!(!vocab.contains("The"));
    }

    #[test]
    fn test_empty_vocabulary() {
        let vocab = Vocabulary::from_words(Vec::<String>::new());
        assert!(vocab.is_empty());
        assert_eq!(vocab.iter().count(), 0);
    }
}
