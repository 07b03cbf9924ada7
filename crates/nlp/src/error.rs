//! Error types for parsing and tokenization.

use recursive_core::CoreError;
use thiserror::Error;

/// Errors that can occur while turning text into dependency trees.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NlpError {
    /// Empty sentence.
    #[error("Cannot parse empty sentence")]
    EmptySentence,

    /// The parser has no analysis for this sentence.
    #[error("No parse available for sentence: '{sentence}'")]
    UnparsedSentence { sentence: String },

    /// A treebank line could not be read.
    #[error("Malformed line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    /// A treebank token points at a head outside its sentence.
    #[error("Line {line}: head {head} is outside its sentence")]
    UnknownHead { line: usize, head: usize },

    /// Words, heads and labels of different lengths.
    #[error("Mismatched lengths: {words} words, {heads} heads, {labels} labels")]
    MismatchedLengths {
        words: usize,
        heads: usize,
        labels: usize,
    },

    /// A token's recorded position disagrees with where it sits.
    #[error("Token at position {position} claims position {idx}")]
    MisplacedToken { position: usize, idx: usize },

    /// Reading a treebank file failed.
    #[error("Cannot read {path}: {reason}")]
    Io { path: String, reason: String },

    /// The head pointers do not form a tree.
    #[error("Malformed tree: {0}")]
    Topology(#[from] CoreError),
}
