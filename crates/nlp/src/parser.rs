//! # Parsers and Tokenizers
//!
//! Encoders never parse text themselves. A tree encoder asks a
//! [`DependencyParser`] for a parse; a chain encoder asks a [`Tokenizer`]
//! for words. Both are traits so a statistical parser can be plugged in
//! behind the same seam as the [`Treebank`](crate::conllu::Treebank) lookup
//! shipped here.

use crate::error::NlpError;
use crate::token::Token;

/// Produces a dependency parse for a sentence.
pub trait DependencyParser: Send + Sync {
    fn parse(&self, sentence: &str) -> Result<Vec<Token>, NlpError>;
}

/// Splits a sentence into word strings.
pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, sentence: &str) -> Vec<String>;
}

/// Punctuation split off the end of a word.
const TRAILING_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

/// Splits on whitespace and detaches trailing punctuation, so that
/// `"mat."` becomes `["mat", "."]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, sentence: &str) -> Vec<String> {
        let mut words = Vec::new();
        for piece in sentence.split_whitespace() {
            let word = piece.trim_end_matches(TRAILING_PUNCTUATION);
            if !word.is_empty() {
                words.push(word.to_string());
            }
            words.extend(piece[word.len()..].chars().map(String::from));
        }
        words
    }
}

/// Collapse runs of whitespace so equivalent spellings share a key.
pub(crate) fn sentence_key(sentence: &str) -> String {
    sentence.split_whitespace().collect::<Vec<_>>().join(" ")
}
