//! # Nets - Recursive and Recurrent Sentence Encoders
//!
//! Five encoders that turn a sentence into a fixed-size vector and learn
//! from a gradient on that vector:
//!
//! | Encoder | Structure | Weights tied by |
//! |---------|-----------|-----------------|
//! | [`DependencyNetwork`] | dependency tree | relation label |
//! | [`HolographicNetwork`] | dependency tree | relation label (fixed bindings) |
//! | [`TreeLstm`] | dependency tree | shared gates |
//! | [`RecurrentNetwork`] | word sequence | time step |
//! | [`Lstm`] | word sequence | time step |
//!
//! ## Architecture
//!
//! ```text
//!                    ┌──────────────────┐
//!  sentence ────────►│ DependencyParser │──► tokens ──► TreeTopology
//!                    └──────────────────┘                   │
//!                                          post-order / pre-order
//!                                                           ▼
//!                    ┌────────────────┐          ┌────────────────────┐
//!  embeddings ──────►│  TreeNetwork   │◄─────────│ TreeCell: tied,    │
//!                    │  ChainNetwork  │◄────┐    │ holographic, LSTM  │
//!                    └────────────────┘     │    └────────────────────┘
//!                                           │    ┌────────────────────┐
//!                                           └────│ ChainCell: RNN,    │
//!                                                │ LSTM               │
//!                                                └────────────────────┘
//! ```
//!
//! One engine per topology does the walking, the bookkeeping and the
//! update; a cell supplies the arithmetic at each node or time step. The
//! parser and tokenizer are collaborators passed in at construction.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use recursive_diff::{loss::squared_error, Tensor};
//! use recursive_nets::{NetConfig, RecurrentNetwork, SentenceEncoder};
//! use recursive_nlp::{Vocabulary, WhitespaceTokenizer};
//!
//! let sentences = vec!["the cat sat".to_string(), "dogs bark".to_string()];
//! let vocab = Vocabulary::from_sentences(&WhitespaceTokenizer, &sentences);
//! let mut rnn =
//!     RecurrentNetwork::new(NetConfig::new(8), vocab.as_slice(), Arc::new(WhitespaceTokenizer))
//!         .unwrap();
//!
//! rnn.forward_pass(&sentences).unwrap();
//! let out = rnn.root_embedding().unwrap();
//! assert_eq!((out.rows, out.cols), (8, 2));
//!
//! let loss = squared_error(out, &Tensor::zeros(8, 2));
//! rnn.backward_pass(&loss.grad, RecurrentNetwork::DEFAULT_RATE).unwrap();
//! ```

pub mod batch;
pub mod cell;
pub mod cells;
pub mod chain;
pub mod config;
pub mod embeddings;
pub mod encoder;
mod error;
pub mod models;
pub mod node;
pub mod params;
pub mod persist;
pub mod tree;

// Re-export key types
pub use batch::{Batch, Slot};
pub use cell::{ChainCell, Clipper, TreeCell, Upstream};
pub use chain::{ChainGradients, ChainNetwork, OutputLayer};
pub use config::{EmbeddingInit, NetConfig};
pub use embeddings::{EmbeddingTable, WordGradients};
pub use encoder::SentenceEncoder;
pub use error::NetError;
pub use models::{DependencyNetwork, HolographicNetwork, Lstm, RecurrentNetwork, TreeLstm};
pub use params::{ParamStore, RoleGradients, RoleParams};
pub use persist::{ChainParams, ModelRecord};
pub use tree::{PassGradients, TreeNetwork};
