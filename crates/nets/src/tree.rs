//! # Tree Engine
//!
//! [`TreeNetwork`] runs any [`TreeCell`] over the dependency parse of a
//! sentence.
//!
//! ## Passes
//!
//! - **Forward**: parse, look up word vectors, then visit the tree in
//!   post-order so every head sees its finished dependents. The root's
//!   embedding is the sentence embedding.
//! - **Backward**: visit the tree in pre-order so every dependent sees its
//!   head's gradient, accumulating parameter and word gradients. Then take
//!   one gradient step.
//!
//! The traversal orders come from [`TreeTopology`], computed once per
//! sentence. Malformed parses are rejected before any arithmetic.

use std::sync::Arc;

use recursive_core::{CoreError, Shape, TreeTopology};
use recursive_diff::{Sgd, Tensor};
use recursive_nlp::{DependencyParser, NlpError, Token};
use tracing::{debug, trace};

use crate::cell::{Clipper, TreeCell, Upstream};
use crate::config::NetConfig;
use crate::embeddings::{EmbeddingTable, WordGradients};
use crate::error::NetError;
use crate::node::{Child, GraphNode};

/// Gradients collected by the most recent backward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct PassGradients<P> {
    /// Parameter gradients in the cell's own layout
    pub params: P,
    /// Summed word-vector gradients with occurrence counts
    pub words: WordGradients,
}

/// A recursive encoder over dependency trees.
pub struct TreeNetwork<C: TreeCell> {
    config: NetConfig,
    parser: Arc<dyn DependencyParser>,
    embeddings: EmbeddingTable,
    cell: C,
    nodes: Vec<GraphNode<C::State, C::Grad>>,
    topology: Option<TreeTopology>,
    last_gradients: Option<PassGradients<C::Grads>>,
    clipped: usize,
}

impl<C: TreeCell> TreeNetwork<C> {
    /// A freshly initialized encoder over `vocab`.
    ///
    /// Word vectors are drawn first, then cell parameters, from the
    /// config's seeded generator.
    pub fn new(
        config: NetConfig,
        vocab: &[String],
        parser: Arc<dyn DependencyParser>,
    ) -> Result<Self, NetError> {
        config.validate()?;
        let mut rng = config.rng();
        let embeddings = EmbeddingTable::from_config(&config, vocab, &mut rng)?;
        let cell = C::init(config.dim, &mut rng);
        debug!(dim = config.dim, vocab = embeddings.len(), "initialized tree encoder");
        Self::from_parts(config, embeddings, cell, parser)
    }

    /// Assemble an encoder from existing parts, checking that their
    /// dimensions agree.
    pub fn from_parts(
        config: NetConfig,
        embeddings: EmbeddingTable,
        cell: C,
        parser: Arc<dyn DependencyParser>,
    ) -> Result<Self, NetError> {
        config.validate()?;
        if embeddings.dim() != config.dim {
            return Err(NetError::DimensionMismatch {
                expected: config.dim,
                got: embeddings.dim(),
            });
        }
        embeddings.validate()?;
        cell.check_shapes(config.dim)?;
        Ok(Self {
            config,
            parser,
            embeddings,
            cell,
            nodes: Vec::new(),
            topology: None,
            last_gradients: None,
            clipped: 0,
        })
    }

    /// Parse `sentence` and encode it.
    pub fn forward_pass(&mut self, sentence: &str) -> Result<(), NetError> {
        let tokens = self.parser.parse(sentence)?;
        self.forward_tokens(tokens)
    }

    /// Encode an already parsed sentence.
    pub fn forward_tokens(&mut self, tokens: Vec<Token>) -> Result<(), NetError> {
        self.topology = None;
        self.last_gradients = None;
        self.nodes.clear();

        let topology = recursive_nlp::token::topology(&tokens).map_err(|e| match e {
            NlpError::Topology(core) => NetError::Core(core),
            other => NetError::Nlp(other),
        })?;
        let nodes = tokens
            .into_iter()
            .map(|token| {
                let (input, known) = self.embeddings.lookup_known(&token.lower);
                if !known {
                    trace!(word = %token.lower, "unknown word reads as zeros");
                }
                GraphNode::new(token, input, known)
            })
            .collect();
        self.nodes = nodes;

        for &i in topology.postorder() {
            for &c in topology.children(i) {
                if !self.nodes[c].computed {
                    return Err(CoreError::UncomputedInput { node: i, input: c }.into());
                }
            }
            let mut children = Vec::with_capacity(topology.children(i).len());
            for &c in topology.children(i) {
                let child = &self.nodes[c];
                let state = child
                    .state
                    .as_ref()
                    .ok_or(CoreError::UncomputedInput { node: i, input: c })?;
                children.push(Child {
                    idx: c,
                    dep: child.dep(),
                    state,
                });
            }
            let state = self.cell.activate(self.nodes[i].view(), &children);
            let node = &mut self.nodes[i];
            node.state = Some(state);
            node.computed = true;
        }

        for node in &mut self.nodes {
            node.computed = false;
        }
        trace!(
            nodes = self.nodes.len(),
            depth = topology.depth(),
            "forward pass complete"
        );
        self.topology = Some(topology);
        Ok(())
    }

    /// The root's D×1 embedding from the last forward pass.
    pub fn root_embedding(&self) -> Result<&Tensor, NetError> {
        let topology = self.topology.as_ref().ok_or(NetError::NoForwardPass)?;
        self.nodes[topology.root()]
            .state
            .as_ref()
            .map(C::embedding)
            .ok_or(NetError::NoForwardPass)
    }

    /// Backpropagate `error_grad` (D×1, the cost gradient at the root
    /// embedding) through the last forward pass and update all parameters
    /// with learning rate `rate`.
    pub fn backward_pass(&mut self, error_grad: &Tensor, rate: f64) -> Result<(), NetError> {
        let topology = self.topology.as_ref().ok_or(NetError::NoForwardPass)?;
        let dim = self.config.dim;
        if error_grad.shape() != Shape::column(dim) {
            return Err(NetError::GradientShape {
                expected: Shape::column(dim),
                got: error_grad.shape(),
            });
        }

        for node in &mut self.nodes {
            node.computed = false;
            node.grad = None;
        }

        let mut grads = self.cell.zero_grads();
        let mut words = WordGradients::new();
        let mut clipper = Clipper::new(self.config.clip_norm);

        for &i in topology.preorder() {
            let (grad, word_grad) = {
                let node = &self.nodes[i];
                let state = node
                    .state
                    .as_ref()
                    .ok_or(CoreError::UncomputedInput { node: i, input: i })?;
                let upstream = match topology.parent(i) {
                    None => Upstream::Root(error_grad),
                    Some(p) => {
                        let parent = &self.nodes[p];
                        match (&parent.state, &parent.grad) {
                            (Some(parent_state), Some(parent_grad)) if parent.computed => {
                                Upstream::Parent {
                                    state: parent_state,
                                    grad: parent_grad,
                                }
                            }
                            _ => return Err(CoreError::UncomputedInput { node: i, input: p }.into()),
                        }
                    }
                };
                self.cell
                    .backprop(node.view(), state, upstream, &mut grads, &mut clipper)
            };
            let node = &mut self.nodes[i];
            if node.known {
                words.add(&node.token.lower, word_grad);
            }
            node.grad = Some(grad);
            node.computed = true;
        }

        let sgd = Sgd::new(rate);
        self.cell.apply(&grads, self.nodes.len(), &sgd);
        self.embeddings.apply_gradients(&words, rate);

        self.clipped = clipper.clipped();
        if self.clipped > 0 {
            debug!(clipped = self.clipped, "gradients clipped during backward pass");
        }
        self.last_gradients = Some(PassGradients {
            params: grads,
            words,
        });
        Ok(())
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn dim(&self) -> usize {
        self.config.dim
    }

    /// Nodes of the last encoded sentence, in sentence order.
    pub fn nodes(&self) -> &[GraphNode<C::State, C::Grad>] {
        &self.nodes
    }

    pub fn topology(&self) -> Option<&TreeTopology> {
        self.topology.as_ref()
    }

    /// Gradients of the last backward pass, as sums before averaging.
    pub fn last_gradients(&self) -> Option<&PassGradients<C::Grads>> {
        self.last_gradients.as_ref()
    }

    /// Whether any gradient was clipped during the last backward pass.
    pub fn clipped(&self) -> bool {
        self.clipped > 0
    }

    pub fn cell(&self) -> &C {
        &self.cell
    }

    pub fn cell_mut(&mut self) -> &mut C {
        &mut self.cell
    }

    pub fn embeddings(&self) -> &EmbeddingTable {
        &self.embeddings
    }

    pub fn embeddings_mut(&mut self) -> &mut EmbeddingTable {
        &mut self.embeddings
    }

    pub fn parser(&self) -> &Arc<dyn DependencyParser> {
        &self.parser
    }
}

impl<C: TreeCell> std::fmt::Debug for TreeNetwork<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeNetwork")
            .field("dim", &self.config.dim)
            .field("vocab", &self.embeddings.len())
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
