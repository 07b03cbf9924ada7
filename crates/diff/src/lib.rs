//! # Diff - Numerics for Recursive Encoders
//!
//! The numeric layer underneath the encoders: dense matrices, element-wise
//! nonlinearities, parameter initializers, plain gradient descent, losses,
//! and the central-difference tooling used to verify hand-written backward
//! passes.
//!
//! ## Core Concepts
//!
//! - **Runtime shapes**: a tree's size and a batch's width are data, so
//!   [`Tensor`] carries its dimensions at runtime
//! - **Derivatives from outputs**: activations are differentiated through
//!   the value they produced, which is what a forward pass caches
//! - **Seeded randomness**: every initializer takes its generator explicitly
//!
//! ## Modules
//!
//! - [`tensor`] - Dense f64 matrices
//! - [`activations`] - sigmoid, tanh, softplus, softmax
//! - [`init`] - Gaussian-identity, Glorot, unit and unitary vectors
//! - [`optim`] - Norm clipping and SGD
//! - [`loss`] - Squared error and softmax cross-entropy
//! - [`gradcheck`] - Central differences and tolerance checks
//!
//! ## Example
//!
//! ```rust
//! use recursive_diff::{activations::tanh, loss::squared_error, Tensor};
//!
//! let w = Tensor::identity(3);
//! let x = Tensor::column(vec![0.5, -0.5, 0.0]);
//! let y = tanh(&w.matmul(&x));
//!
//! let loss = squared_error(&y, &Tensor::zeros(3, 1));
//! assert_eq!(loss.grad, y);
//! ```

pub mod activations;
pub mod gradcheck;
pub mod init;
pub mod loss;
pub mod optim;
pub mod tensor;

// Re-export key types
pub use gradcheck::{GradCheck, GradCheckError};
pub use loss::Loss;
pub use optim::{clip_norm, Sgd, DEFAULT_CLIP_NORM};
pub use tensor::Tensor;
