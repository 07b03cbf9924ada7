//! Per-sentence graph nodes.
//!
//! A tree encoder turns each parsed token into a [`GraphNode`]. The node
//! carries the token, the word vector looked up for it, and two typed slots
//! filled in by the encoder's cell: the forward state and the backward
//! scratch.

use recursive_diff::Tensor;
use recursive_nlp::Token;

/// One token of the sentence being encoded.
#[derive(Debug, Clone)]
pub struct GraphNode<S, G> {
    pub token: Token,
    /// Word vector, or zeros for an unknown word
    pub input: Tensor,
    /// Whether the word was in the vocabulary
    pub known: bool,
    /// Set once the current pass has processed this node
    pub computed: bool,
    /// Forward state, present after a forward pass
    pub state: Option<S>,
    /// Backward scratch, present after a backward pass
    pub grad: Option<G>,
}

impl<S, G> GraphNode<S, G> {
    pub fn new(token: Token, input: Tensor, known: bool) -> Self {
        Self {
            token,
            input,
            known,
            computed: false,
            state: None,
            grad: None,
        }
    }

    pub fn idx(&self) -> usize {
        self.token.idx
    }

    /// Lowercased word.
    pub fn word(&self) -> &str {
        &self.token.lower
    }

    pub fn dep(&self) -> &str {
        &self.token.dep
    }

    pub fn view(&self) -> NodeView<'_> {
        NodeView {
            idx: self.token.idx,
            dep: &self.token.dep,
            input: &self.input,
            known: self.known,
        }
    }
}

/// The parts of a node a cell reads.
#[derive(Debug, Clone, Copy)]
pub struct NodeView<'a> {
    pub idx: usize,
    pub dep: &'a str,
    pub input: &'a Tensor,
    pub known: bool,
}

/// A computed dependent handed to its head's cell.
#[derive(Debug, Clone, Copy)]
pub struct Child<'a, S> {
    pub idx: usize,
    pub dep: &'a str,
    pub state: &'a S,
}
