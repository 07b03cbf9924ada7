//! # Losses
//!
//! Cost functions that turn an encoder's output into a scalar and an error
//! gradient. The gradient has the shape of the prediction and is what a
//! caller feeds back into an encoder's backward pass.

use crate::activations::softmax;
use crate::tensor::Tensor;

/// A scalar cost and its gradient with respect to the prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct Loss {
    pub cost: f64,
    pub grad: Tensor,
}

/// `½ Σ (prediction − target)²` over every entry.
///
/// The gradient is `prediction − target`. For a D×B batch the cost is summed
/// over the columns; divide by B for the batch mean.
pub fn squared_error(prediction: &Tensor, target: &Tensor) -> Loss {
    let grad = prediction.sub(target);
    let cost = 0.5 * grad.dot(&grad);
    Loss { cost, grad }
}

/// Cross-entropy of `softmax(scores)` against one-hot (or soft) targets,
/// computed column by column and summed.
///
/// The gradient with respect to the scores is `softmax(scores) − targets`.
pub fn softmax_cross_entropy(scores: &Tensor, targets: &Tensor) -> Loss {
    let probs = softmax(scores);
    let cost = -probs
        .zip_map(targets, |p, t| if t > 0.0 { t * p.ln() } else { 0.0 })
        .as_slice()
        .iter()
        .sum::<f64>();
    Loss {
        cost,
        grad: probs.sub(targets),
    }
}
