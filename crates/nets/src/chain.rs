//! # Chain Engine
//!
//! [`ChainNetwork`] runs any [`ChainCell`] over a left-padded batch of
//! sentences, all sentences in lock-step. After the last time step a shared
//! output layer maps each final hidden state to the sentence embedding:
//!
//! ```text
//! y = tanh(W_y·h_{T−1} + b_y)          D×B, one column per sentence
//! ```
//!
//! The backward pass is backpropagation through time from `T−1` down to
//! `0`. Parameter gradients are averaged over the batch and clipped; word
//! gradients skip PAD slots and are averaged over each word's occurrences.
//!
//! A sentence stays in the zero initial state while it is still padding,
//! so its embedding is the same whether it runs alone or in a batch.

use std::sync::Arc;

use recursive_core::{CoreError, Shape};
use recursive_diff::activations::{tanh, tanh_grad};
use recursive_diff::{Sgd, Tensor};
use recursive_nlp::Tokenizer;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::batch::Batch;
use crate::cell::{ChainCell, Clipper};
use crate::config::NetConfig;
use crate::embeddings::{EmbeddingTable, WordGradients};
use crate::error::NetError;
use crate::tree::PassGradients;

/// The dense tanh layer on top of the last hidden state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputLayer {
    pub weight: Tensor,
    pub bias: Tensor,
}

impl OutputLayer {
    pub fn forward(&self, hidden: &Tensor) -> Tensor {
        tanh(&self.weight.matmul(hidden).add_column(&self.bias))
    }

    pub fn check_shapes(&self, dim: usize) -> Result<(), CoreError> {
        self.weight.expect_shape(dim, dim)?;
        self.bias.expect_shape(dim, 1)
    }
}

/// Cell and output-layer gradients of one chain backward pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainGradients<G> {
    pub cell: G,
    pub output_weight: Tensor,
    pub output_bias: Tensor,
}

/// Everything the forward pass keeps for backpropagation.
#[derive(Debug, Clone)]
struct ChainPass<S> {
    batch: Batch,
    /// D×B inputs per time step
    inputs: Vec<Tensor>,
    /// The zero initial step followed by one step per time step
    steps: Vec<S>,
    output: Tensor,
}

/// A recurrent encoder over batches of word sequences.
pub struct ChainNetwork<C: ChainCell> {
    config: NetConfig,
    tokenizer: Arc<dyn Tokenizer>,
    embeddings: EmbeddingTable,
    cell: C,
    output: OutputLayer,
    pass: Option<ChainPass<C::Step>>,
    last_gradients: Option<PassGradients<ChainGradients<C::Grads>>>,
    clipped: usize,
}

impl<C: ChainCell> ChainNetwork<C> {
    /// A freshly initialized encoder over `vocab`.
    pub fn new(
        config: NetConfig,
        vocab: &[String],
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self, NetError> {
        config.validate()?;
        let mut rng = config.rng();
        let embeddings = EmbeddingTable::from_config(&config, vocab, &mut rng)?;
        let (cell, output) = C::init(config.dim, &mut rng);
        debug!(dim = config.dim, vocab = embeddings.len(), "initialized chain encoder");
        Self::from_parts(config, embeddings, cell, output, tokenizer)
    }

    /// Assemble an encoder from existing parts, checking that their
    /// dimensions agree.
    pub fn from_parts(
        config: NetConfig,
        embeddings: EmbeddingTable,
        cell: C,
        output: OutputLayer,
        tokenizer: Arc<dyn Tokenizer>,
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
        output.check_shapes(config.dim)?;
        Ok(Self {
            config,
            tokenizer,
            embeddings,
            cell,
            output,
            pass: None,
            last_gradients: None,
            clipped: 0,
        })
    }

    /// Tokenize and encode a batch of sentences.
    pub fn forward_batch<S: AsRef<str>>(&mut self, sentences: &[S]) -> Result<(), NetError> {
        let tokenized = sentences
            .iter()
            .map(|s| self.tokenizer.tokenize(s.as_ref()))
            .collect();
        self.forward_tokens(tokenized)
    }

    /// Encode a batch of already tokenized sentences.
    pub fn forward_tokens(&mut self, sentences: Vec<Vec<String>>) -> Result<(), NetError> {
        self.pass = None;
        self.last_gradients = None;

        let batch = Batch::left_padded(sentences)?;
        let seq_len = batch.seq_len();
        let mut inputs = Vec::with_capacity(seq_len);
        let mut steps = Vec::with_capacity(seq_len + 1);
        steps.push(self.cell.initial_step(batch.size()));

        for t in 0..seq_len {
            let x = batch.inputs_at(t, &self.embeddings);
            let mut next = self.cell.step(&x, &steps[t]);
            C::mask_step(&mut next, &batch.pad_columns(t));
            trace!(t, "chain step");
            inputs.push(x);
            steps.push(next);
        }
        let output = self.output.forward(C::hidden(&steps[seq_len]));

        debug!(batch = batch.size(), seq_len, "forward pass complete");
        self.pass = Some(ChainPass {
            batch,
            inputs,
            steps,
            output,
        });
        Ok(())
    }

    /// D×B sentence embeddings from the last forward pass, one column per
    /// sentence.
    pub fn output(&self) -> Result<&Tensor, NetError> {
        self.pass
            .as_ref()
            .map(|pass| &pass.output)
            .ok_or(NetError::NoForwardPass)
    }

    /// Same as [`output`](Self::output).
    pub fn root_embedding(&self) -> Result<&Tensor, NetError> {
        self.output()
    }

    /// Backpropagate `error_grad` (D×B, the cost gradient at each
    /// sentence's embedding) through time and update all parameters with
    /// learning rate `rate`.
    pub fn backward_pass(&mut self, error_grad: &Tensor, rate: f64) -> Result<(), NetError> {
        let pass = self.pass.as_ref().ok_or(NetError::NoForwardPass)?;
        let batch_size = pass.batch.size();
        let expected = Shape::new(self.config.dim, batch_size);
        if error_grad.shape() != expected {
            return Err(NetError::GradientShape {
                expected,
                got: error_grad.shape(),
            });
        }

        let seq_len = pass.batch.seq_len();
        let last = &pass.steps[seq_len];
        let dy = error_grad.hadamard(&tanh_grad(&pass.output));
        let mut output_weight = dy.matmul_t(C::hidden(last));
        let mut output_bias = dy.sum_columns();

        let mut grads = self.cell.zero_grads();
        let mut words = WordGradients::new();
        let mut carry = self.cell.seed_carry(self.output.weight.t_matmul(&dy));

        for t in (0..seq_len).rev() {
            C::mask_carry(&mut carry, &pass.batch.pad_columns(t));
            let (prev_carry, dx) = self.cell.backward_step(
                &pass.inputs[t],
                &pass.steps[t],
                &pass.steps[t + 1],
                carry,
                &mut grads,
            );
            for (b, slot) in pass.batch.slots_at(t).enumerate() {
                if let Some(word) = slot.word() {
                    if self.embeddings.contains(word) {
                        words.add(word, dx.column_at(b));
                    }
                }
            }
            carry = prev_carry;
        }

        let mut clipper = Clipper::new(self.config.clip_norm);
        C::finish_grads(&mut grads, batch_size, &mut clipper);
        clipper.average_and_clip(&mut output_weight, batch_size);
        clipper.average_and_clip(&mut output_bias, batch_size);

        let sgd = Sgd::new(rate);
        self.cell.apply(&grads, &sgd);
        sgd.step(&mut self.output.weight, &output_weight);
        sgd.step(&mut self.output.bias, &output_bias);
        self.embeddings.apply_gradients(&words, rate);

        self.clipped = clipper.clipped();
        if self.clipped > 0 {
            debug!(clipped = self.clipped, "gradients clipped during backward pass");
        }
        debug!(batch = batch_size, seq_len, "backward pass complete");
        self.last_gradients = Some(PassGradients {
            params: ChainGradients {
                cell: grads,
                output_weight,
                output_bias,
            },
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

    /// The padded batch of the last forward pass.
    pub fn batch(&self) -> Option<&Batch> {
        self.pass.as_ref().map(|pass| &pass.batch)
    }

    /// Gradients of the last backward pass: parameter gradients after batch
    /// averaging and clipping, word gradients as sums with counts.
    pub fn last_gradients(&self) -> Option<&PassGradients<ChainGradients<C::Grads>>> {
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

    pub fn output_layer(&self) -> &OutputLayer {
        &self.output
    }

    pub fn output_layer_mut(&mut self) -> &mut OutputLayer {
        &mut self.output
    }

    pub fn embeddings(&self) -> &EmbeddingTable {
        &self.embeddings
    }

    pub fn embeddings_mut(&mut self) -> &mut EmbeddingTable {
        &mut self.embeddings
    }

    pub fn tokenizer(&self) -> &Arc<dyn Tokenizer> {
        &self.tokenizer
    }
}

impl<C: ChainCell> std::fmt::Debug for ChainNetwork<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainNetwork")
            .field("dim", &self.config.dim)
            .field("vocab", &self.embeddings.len())
            .field("batch", &self.pass.as_ref().map(|p| p.batch.size()))
            .finish()
    }
}
