//! # Optimization
//!
//! Plain gradient descent plus the norm clipping every encoder applies to its
//! gradients.
//!
//! ## Example
//!
//! ```rust
//! use recursive_diff::optim::{clip_norm, Sgd};
//! use recursive_diff::Tensor;
//!
//! let mut param = Tensor::zeros(3, 1);
//! let mut grad = Tensor::column(vec![30.0, 40.0, 0.0]);
//!
//! // Norm 50 is rescaled down to 5.
//! assert_eq!(clip_norm(&mut grad, 5.0), Some(50.0));
//!
//! Sgd::new(0.1).step(&mut param, &grad);
//! assert!((param.as_slice()[0] + 0.3).abs() < 1e-12);
//! ```

use tracing::trace;

use crate::tensor::Tensor;

/// Norm ceiling applied to gradients unless configured otherwise.
pub const DEFAULT_CLIP_NORM: f64 = 5.0;

/// Rescale `grad` in place so its L2 norm is at most `max_norm`.
///
/// Returns the norm before clipping when a rescale happened.
pub fn clip_norm(grad: &mut Tensor, max_norm: f64) -> Option<f64> {
    let norm = grad.norm();
    if norm > max_norm {
        let factor = max_norm / norm;
        for x in grad.as_slice_mut() {
            *x *= factor;
        }
        trace!(norm, max_norm, "clipped gradient");
        Some(norm)
    } else {
        None
    }
}

/// Stochastic Gradient Descent.
///
/// Updates parameters using: `θ = θ - lr * ∇L`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sgd {
    /// Learning rate (step size)
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }

    /// Update one parameter in place: `param = param - lr * grad`.
    pub fn step(&self, param: &mut Tensor, grad: &Tensor) {
        assert_eq!(
            param.shape(),
            grad.shape(),
            "Param shape {} must match grad shape {}",
            param.shape(),
            grad.shape()
        );
        for (p, g) in param.as_slice_mut().iter_mut().zip(grad.as_slice()) {
            *p -= self.learning_rate * g;
        }
    }

    /// Update with a gradient that is first divided by `count`.
    ///
    /// Used for gradients summed over several uses of a shared parameter.
    pub fn step_averaged(&self, param: &mut Tensor, grad_sum: &Tensor, count: usize) {
        let count = count.max(1) as f64;
        self.step(param, &grad_sum.map(|g| g / count));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_leaves_small_gradients() {
        let mut g = Tensor::column(vec![1.0, 2.0]);
        assert_eq!(clip_norm(&mut g, DEFAULT_CLIP_NORM), None);
        assert_eq!(g, Tensor::column(vec![1.0, 2.0]));
    }

    #[test]
    fn test_clip_rescales_to_ceiling() {
        let mut g = Tensor::filled(4, 4, 10.0);
        let before = clip_norm(&mut g, 5.0);
        assert_eq!(before, Some(40.0));
        assert!((g.norm() - 5.0).abs() < 1e-12);
        // direction is kept
        assert!(g.as_slice().iter().all(|&x| (x - 1.25).abs() < 1e-12));
    }

    #[test]
    fn test_sgd_step() {
        let mut p = Tensor::column(vec![1.0, 1.0]);
        Sgd::new(0.5).step(&mut p, &Tensor::column(vec![2.0, -2.0]));
        assert_eq!(p, Tensor::column(vec![0.0, 2.0]));
    }

    #[test]
    fn test_sgd_step_averaged() {
        let mut p = Tensor::column(vec![0.0]);
        Sgd::new(1.0).step_averaged(&mut p, &Tensor::column(vec![6.0]), 3);
        assert_eq!(p, Tensor::column(vec![-2.0]));
    }

    #[test]
    fn test_zero_rate_keeps_parameters() {
        let mut p = Tensor::column(vec![0.25, -3.5]);
        Sgd::new(0.0).step(&mut p, &Tensor::column(vec![1e3, -7.0]));
        assert_eq!(p, Tensor::column(vec![0.25, -3.5]));
    }
}
