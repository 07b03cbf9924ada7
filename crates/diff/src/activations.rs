//! # Nonlinearities
//!
//! Element-wise activations and their derivatives. Derivatives are written in
//! terms of the activation's *output* `y`, which is what the encoders keep
//! around after a forward pass:
//!
//! | Activation | Forward | Derivative from output |
//! |------------|---------|------------------------|
//! | sigmoid | 1 / (1 + e⁻ˣ) | y(1 − y) |
//! | tanh | tanh x | 1 − y² |
//! | softplus | ln(1 + eˣ) | 1 − e⁻ʸ |
//!
//! `softmax` normalizes each column independently.

use crate::tensor::Tensor;

pub fn sigmoid(x: &Tensor) -> Tensor {
    x.map(|v| 1.0 / (1.0 + (-v).exp()))
}

/// σ'(x) expressed through y = σ(x).
pub fn sigmoid_grad(y: &Tensor) -> Tensor {
    y.map(|v| v * (1.0 - v))
}

pub fn tanh(x: &Tensor) -> Tensor {
    x.map(f64::tanh)
}

/// tanh'(x) expressed through y = tanh(x).
pub fn tanh_grad(y: &Tensor) -> Tensor {
    y.map(|v| 1.0 - v * v)
}

/// ln(1 + eˣ), evaluated without overflow for large x.
pub fn softplus(x: &Tensor) -> Tensor {
    x.map(|v| v.max(0.0) + (-v.abs()).exp().ln_1p())
}

/// softplus'(x) = σ(x), expressed through y = softplus(x).
pub fn softplus_grad(y: &Tensor) -> Tensor {
    y.map(|v| 1.0 - (-v).exp())
}

/// Column-wise softmax.
pub fn softmax(x: &Tensor) -> Tensor {
    let mut out = x.zeros_like();
    for j in 0..x.cols {
        let max = (0..x.rows)
            .map(|i| x.get(i, j))
            .fold(f64::NEG_INFINITY, f64::max);
        let mut total = 0.0;
        for i in 0..x.rows {
            let e = (x.get(i, j) - max).exp();
            out.set(i, j, e);
            total += e;
        }
        for i in 0..x.rows {
            out.set(i, j, out.get(i, j) / total);
        }
    }
    out
}
