//! The five cells.
//!
//! | Cell | Engine | Per-node or per-step computation |
//! |------|--------|----------------------------------|
//! | [`TiedCell`] | tree | `tanh(W_m·x + Σ W_dep·h_c + b_dep)` |
//! | [`HolographicCell`] | tree | `x + Σ C_dep·h_c + b_dep`, fixed circulant `C_dep` |
//! | [`TreeLstmCell`] | tree | child-sum LSTM, one forget gate per child |
//! | [`RnnCell`] | chain | `tanh(W_hh·h + W_xh·x + b_h)` |
//! | [`LstmCell`] | chain | four-gate LSTM |

pub mod gate;
pub mod holographic;
pub mod lstm;
pub mod rnn;
pub mod tied;
pub mod tree_lstm;

pub use gate::{Gate, GateGrads};
pub use holographic::HolographicCell;
pub use lstm::{LstmCarry, LstmCell, LstmGrads, LstmStep};
pub use rnn::{RnnCell, RnnGrads};
pub use tied::{TiedCell, TiedGrads};
pub use tree_lstm::{ForgetEdge, TreeLstmCell, TreeLstmGrad, TreeLstmGrads, TreeLstmState};
