//! The interface a downstream classifier trains an encoder through.
//!
//! ```rust
//! use std::sync::Arc;
//! use recursive_diff::{loss::squared_error, Tensor};
//! use recursive_nets::{DependencyNetwork, NetConfig, SentenceEncoder};
//! use recursive_nlp::{Treebank, Vocabulary};
//!
//! let treebank = Treebank::from_conllu(
//!     "1\tdogs\t_\t_\t_\t_\t2\tnsubj\t_\t_\n\
//!      2\tbark\t_\t_\t_\t_\t0\troot\t_\t_\n",
//! )
//! .unwrap();
//! let vocab = Vocabulary::from_treebank(&treebank);
//! let mut net =
//!     DependencyNetwork::new(NetConfig::new(4), vocab.as_slice(), Arc::new(treebank)).unwrap();
//!
//! net.forward_pass("dogs bark").unwrap();
//! let loss = squared_error(net.root_embedding().unwrap(), &Tensor::zeros(4, 1));
//! net.backward_pass(&loss.grad, DependencyNetwork::DEFAULT_RATE).unwrap();
//! ```

use recursive_diff::Tensor;

use crate::cell::{ChainCell, TreeCell};
use crate::chain::ChainNetwork;
use crate::error::NetError;
use crate::tree::TreeNetwork;

/// Encode, read the embedding, push a gradient back.
pub trait SentenceEncoder {
    /// What one forward pass consumes: a sentence for tree encoders, a
    /// batch of sentences for chain encoders.
    type Input: ?Sized;

    /// Learning rate that suits this architecture.
    const DEFAULT_RATE: f64;

    fn forward_pass(&mut self, input: &Self::Input) -> Result<(), NetError>;

    /// D×1 for a tree encoder, D×B for a chain encoder.
    fn root_embedding(&self) -> Result<&Tensor, NetError>;

    /// `error_grad` has the shape of [`root_embedding`](Self::root_embedding).
    fn backward_pass(&mut self, error_grad: &Tensor, rate: f64) -> Result<(), NetError>;
}

impl<C: TreeCell> SentenceEncoder for TreeNetwork<C> {
    type Input = str;

    const DEFAULT_RATE: f64 = C::DEFAULT_RATE;

    fn forward_pass(&mut self, input: &str) -> Result<(), NetError> {
        TreeNetwork::forward_pass(self, input)
    }

    fn root_embedding(&self) -> Result<&Tensor, NetError> {
        TreeNetwork::root_embedding(self)
    }

    fn backward_pass(&mut self, error_grad: &Tensor, rate: f64) -> Result<(), NetError> {
        TreeNetwork::backward_pass(self, error_grad, rate)
    }
}

impl<C: ChainCell> SentenceEncoder for ChainNetwork<C> {
    type Input = [String];

    const DEFAULT_RATE: f64 = C::DEFAULT_RATE;

    fn forward_pass(&mut self, input: &[String]) -> Result<(), NetError> {
        self.forward_batch(input)
    }

    fn root_embedding(&self) -> Result<&Tensor, NetError> {
        ChainNetwork::root_embedding(self)
    }

    fn backward_pass(&mut self, error_grad: &Tensor, rate: f64) -> Result<(), NetError> {
        ChainNetwork::backward_pass(self, error_grad, rate)
    }
}
