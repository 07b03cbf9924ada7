//! The five encoders by name.

use crate::cells::{HolographicCell, LstmCell, RnnCell, TiedCell, TreeLstmCell};
use crate::chain::ChainNetwork;
use crate::tree::TreeNetwork;

/// Tanh recursive network with per-label weights and a structural matrix.
pub type DependencyNetwork = TreeNetwork<TiedCell>;

/// Linear tree encoder binding dependents by circular convolution.
pub type HolographicNetwork = TreeNetwork<HolographicCell>;

/// Child-sum tree-LSTM.
pub type TreeLstm = TreeNetwork<TreeLstmCell>;

/// Elman RNN over left-padded batches.
pub type RecurrentNetwork = ChainNetwork<RnnCell>;

/// LSTM over left-padded batches.
pub type Lstm = ChainNetwork<LstmCell>;
