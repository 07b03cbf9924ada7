//! # Tokens - Nodes of a Dependency Parse
//!
//! A parsed sentence is a list of tokens. Each token knows its position, its
//! surface form, the position of its head and the relation to that head. The
//! root token is its own head.
//!
//! ## Example
//!
//! ```rust
//! use recursive_nlp::Token;
//!
//! let tokens = Token::tree_from_heads(&["Cat", "sat"], &[1, 1], &["nsubj", "ROOT"]).unwrap();
//! assert_eq!(tokens[0].lower, "cat");
//! assert_eq!(tokens[1].children, vec![0]);
//! assert!(tokens[1].is_root());
//! ```

use recursive_core::TreeTopology;
use serde::{Deserialize, Serialize};

use crate::error::NlpError;

/// One token of a dependency parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Position in the sentence, starting at 0
    pub idx: usize,
    /// Surface form
    pub text: String,
    /// Lowercased surface form, used for embedding lookup
    pub lower: String,
    /// Position of the head; equal to `idx` for the root
    pub head: usize,
    /// Positions of the dependents, in sentence order
    pub children: Vec<usize>,
    /// Relation to the head
    pub dep: String,
}

impl Token {
    /// Create a token with no dependents recorded yet.
    pub fn new(idx: usize, text: impl Into<String>, head: usize, dep: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            idx,
            lower: text.to_lowercase(),
            text,
            head,
            children: Vec::new(),
            dep: dep.into(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.head == self.idx
    }

    /// Build a validated parse from parallel slices of words, head positions
    /// and relation labels.
    pub fn tree_from_heads(
        words: &[&str],
        heads: &[usize],
        labels: &[&str],
    ) -> Result<Vec<Token>, NlpError> {
        if words.len() != heads.len() || words.len() != labels.len() {
            return Err(NlpError::MismatchedLengths {
                words: words.len(),
                heads: heads.len(),
                labels: labels.len(),
            });
        }
        if words.is_empty() {
            return Err(NlpError::EmptySentence);
        }
        let mut tokens: Vec<Token> = words
            .iter()
            .zip(heads)
            .zip(labels)
            .enumerate()
            .map(|(idx, ((word, &head), label))| Token::new(idx, *word, head, *label))
            .collect();
        link_children(&mut tokens)?;
        Ok(tokens)
    }
}

/// Validate the head pointers of `tokens` and return their tree.
///
/// Token positions must be `0..len` in order.
pub fn topology(tokens: &[Token]) -> Result<TreeTopology, NlpError> {
    for (pos, token) in tokens.iter().enumerate() {
        if token.idx != pos {
            return Err(NlpError::MisplacedToken {
                position: pos,
                idx: token.idx,
            });
        }
    }
    let heads: Vec<usize> = tokens.iter().map(|t| t.head).collect();
    Ok(TreeTopology::from_heads(&heads)?)
}

/// Validate `tokens` and fill in every token's `children` from the heads.
pub fn link_children(tokens: &mut [Token]) -> Result<TreeTopology, NlpError> {
    let tree = topology(tokens)?;
    for token in tokens.iter_mut() {
        token.children = tree.children(token.idx).to_vec();
    }
    Ok(tree)
}
