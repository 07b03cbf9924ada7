//! # Initialization
//!
//! Parameter initializers. Every initializer takes the random generator
//! explicitly, so a seeded generator gives a reproducible model.
//!
//! ## Holographic reduced representations
//!
//! A holographic encoder binds a dependent to its role by circular
//! convolution with a fixed role vector. Convolution with `v` is the same as
//! multiplying by the circulant matrix `C[i][j] = v[(i − j) mod n]`. When
//! every Fourier coefficient of `v` has magnitude one, `C` is orthogonal, so
//! binding neither blows up nor shrinks a vector. [`unitary_vector`] produces
//! such a `v`.

use std::f64::consts::PI;

use rand::Rng;
use rand_distr::StandardNormal;

use crate::tensor::Tensor;

/// Fourier coefficients smaller than this are replaced by 1 before
/// normalization.
const DEGENERATE_COEFFICIENT: f64 = 1e-12;

/// Identity plus small Gaussian noise (σ = 0.01) on every entry.
pub fn gaussian_identity<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Tensor {
    let mut t = Tensor::identity(dim);
    for x in t.as_slice_mut() {
        let z: f64 = rng.sample(StandardNormal);
        *x += 0.01 * z;
    }
    t
}

/// Glorot uniform: U(−ε, ε) with ε = √6 / √(rows + cols).
pub fn glorot_uniform<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Tensor {
    let eps = 6f64.sqrt() / ((rows + cols) as f64).sqrt();
    let data = (0..rows * cols).map(|_| rng.gen_range(-eps..eps)).collect();
    Tensor::from_data(rows, cols, data)
}

/// Column vector with entries drawn from N(0, 1/√dim).
pub fn random_vector<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Tensor {
    let sd = 1.0 / (dim as f64).sqrt();
    Tensor::column(
        (0..dim)
            .map(|_| {
                let z: f64 = rng.sample(StandardNormal);
                sd * z
            })
            .collect(),
    )
}

/// A [`random_vector`] scaled to unit length.
pub fn random_unit_vector<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Tensor {
    random_vector(dim, rng).normalized()
}

/// A random real vector whose discrete Fourier coefficients all have unit
/// magnitude.
pub fn unitary_vector<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> Tensor {
    let x = random_vector(dim, rng);
    let n = dim as f64;

    // Forward DFT, normalizing each coefficient to the unit circle.
    let mut spectrum = Vec::with_capacity(dim);
    for k in 0..dim {
        let (mut re, mut im) = (0.0, 0.0);
        for (j, &v) in x.as_slice().iter().enumerate() {
            let angle = -2.0 * PI * (j * k) as f64 / n;
            re += v * angle.cos();
            im += v * angle.sin();
        }
        let magnitude = re.hypot(im);
        if magnitude < DEGENERATE_COEFFICIENT {
            spectrum.push((1.0, 0.0));
        } else {
            spectrum.push((re / magnitude, im / magnitude));
        }
    }

    // Inverse DFT. The input was real, so the spectrum is conjugate
    // symmetric and the imaginary parts cancel.
    let data = (0..dim)
        .map(|j| {
            let mut re = 0.0;
            for (k, &(sr, si)) in spectrum.iter().enumerate() {
                let angle = 2.0 * PI * (j * k) as f64 / n;
                re += sr * angle.cos() - si * angle.sin();
            }
            re / n
        })
        .collect();
    Tensor::column(data)
}

/// The circulant matrix `C[i][j] = v[(i − j) mod n]`, so that `C · x` is
/// the circular convolution of `v` and `x`.
pub fn convolution_matrix(v: &Tensor) -> Tensor {
    let n = v.len();
    let mut c = Tensor::zeros(n, n);
    for i in 0..n {
        for j in 0..n {
            c.set(i, j, v.as_slice()[(i + n - j) % n]);
        }
    }
    c
}
