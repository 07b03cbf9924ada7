//! # Tensors - Dense Row-Major Matrices
//!
//! Every quantity in a recursive encoder is a small dense matrix: a D×1
//! embedding, a D×B batch, a D×D weight. `Tensor` keeps its data flattened
//! in row-major order and checks shapes at runtime, since sentence lengths
//! and batch widths are only known once data arrives.
//!
//! ## Operations
//!
//! | Method | Result | Used for |
//! |--------|--------|----------|
//! | `matmul` | A·B | forward products |
//! | `t_matmul` | Aᵀ·B | pushing gradients down through a weight |
//! | `matmul_t` | A·Bᵀ | weight gradients (δ·xᵀ) |
//! | `hadamard` | A⊙B | gating and nonlinearity derivatives |
//! | `add_column` | A + b·1ᵀ | broadcasting a bias over a batch |
//! | `sum_columns` | A·1 | bias gradients over a batch |
//!
//! Shape errors inside a computation are programming errors and panic, like
//! indexing out of bounds. Shapes that come from callers are checked with
//! [`Tensor::expect_shape`] before any arithmetic happens.

use std::fmt;

use recursive_core::{CoreError, Shape};
use serde::{Deserialize, Serialize};

/// A dense f64 matrix with runtime dimensions.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    /// Number of rows
    pub rows: usize,
    /// Number of columns
    pub cols: usize,
    /// Flattened data in row-major order
    pub data: Vec<f64>,
}

impl Tensor {
    /// Create a tensor filled with zeros.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    /// Create a tensor filled with a constant value.
    pub fn filled(rows: usize, cols: usize, value: f64) -> Self {
        Self {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Create a tensor of zeros with the same shape as `self`.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.rows, self.cols)
    }

    /// The n×n identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut t = Self::zeros(n, n);
        for i in 0..n {
            t.data[i * n + i] = 1.0;
        }
        t
    }

    /// A column vector (n×1).
    pub fn column(data: Vec<f64>) -> Self {
        Self {
            rows: data.len(),
            cols: 1,
            data,
        }
    }

    /// Create a tensor from data with the given dimensions.
    pub fn from_data(rows: usize, cols: usize, data: Vec<f64>) -> Self {
        assert_eq!(
            data.len(),
            rows * cols,
            "Data length {} doesn't match shape [{}×{}]",
            data.len(),
            rows,
            cols
        );
        Self { rows, cols, data }
    }

    /// Create a matrix from a slice of equally long rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), cols, "Row {} has length {}, expected {}", i, row.len(), cols);
            data.extend_from_slice(row);
        }
        Self {
            rows: rows.len(),
            cols,
            data,
        }
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.rows, self.cols)
    }

    /// Return an error unless `self` is `rows`×`cols`.
    pub fn expect_shape(&self, rows: usize, cols: usize) -> Result<(), CoreError> {
        if self.rows == rows && self.cols == cols && self.data.len() == rows * cols {
            Ok(())
        } else {
            Err(CoreError::ShapeMismatch {
                expected: Shape::new(rows, cols),
                got: self.shape(),
            })
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.cols + col] = value;
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_slice_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    // ========================================================================
    // Products
    // ========================================================================

    /// Matrix product `self · other`.
    pub fn matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(
            self.cols, other.rows,
            "Inner dimensions must match: {} vs {}",
            self.shape(),
            other.shape()
        );
        let (m, k, n) = (self.rows, self.cols, other.cols);
        let mut result = vec![0.0; m * n];
        for i in 0..m {
            for kk in 0..k {
                let a = self.data[i * k + kk];
                for j in 0..n {
                    result[i * n + j] += a * other.data[kk * n + j];
                }
            }
        }
        Tensor::from_data(m, n, result)
    }

    /// Matrix product `selfᵀ · other`, without materializing the transpose.
    pub fn t_matmul(&self, other: &Tensor) -> Tensor {
        assert_eq!(
            self.rows, other.rows,
            "Row counts must match for transposed product: {} vs {}",
            self.shape(),
            other.shape()
        );
        let (k, m, n) = (self.rows, self.cols, other.cols);
        let mut result = vec![0.0; m * n];
        for kk in 0..k {
            for i in 0..m {
                let a = self.data[kk * m + i];
                for j in 0..n {
                    result[i * n + j] += a * other.data[kk * n + j];
                }
            }
        }
        Tensor::from_data(m, n, result)
    }

    /// Matrix product `self · otherᵀ`. For two columns this is the outer
    /// product; for two D×B batches it sums the outer products column by
    /// column.
    pub fn matmul_t(&self, other: &Tensor) -> Tensor {
        assert_eq!(
            self.cols, other.cols,
            "Column counts must match for transposed product: {} vs {}",
            self.shape(),
            other.shape()
        );
        let (m, k, n) = (self.rows, self.cols, other.rows);
        let mut result = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                let mut sum = 0.0;
                for kk in 0..k {
                    sum += self.data[i * k + kk] * other.data[j * k + kk];
                }
                result[i * n + j] = sum;
            }
        }
        Tensor::from_data(m, n, result)
    }

    /// Outer product `a · bᵀ` of two column vectors.
    pub fn outer(a: &Tensor, b: &Tensor) -> Tensor {
        assert!(a.cols == 1 && b.cols == 1, "outer expects columns, got {} and {}", a.shape(), b.shape());
        a.matmul_t(b)
    }

    /// Transpose.
    pub fn transpose(&self) -> Tensor {
        let mut result = Tensor::zeros(self.cols, self.rows);
        for i in 0..self.rows {
            for j in 0..self.cols {
                result.data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        result
    }

    /// Sum of element-wise products.
    pub fn dot(&self, other: &Tensor) -> f64 {
        assert_eq!(self.shape(), other.shape(), "Shape mismatch for dot");
        self.data.iter().zip(&other.data).map(|(a, b)| a * b).sum()
    }

    // ========================================================================
    // Element-wise
    // ========================================================================

    /// Apply `f` to every element.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Tensor {
        Tensor {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Combine two equally shaped tensors element by element.
    pub fn zip_map(&self, other: &Tensor, f: impl Fn(f64, f64) -> f64) -> Tensor {
        assert_eq!(
            self.shape(),
            other.shape(),
            "Shape mismatch: {} vs {}",
            self.shape(),
            other.shape()
        );
        Tensor {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        }
    }

    pub fn add(&self, other: &Tensor) -> Tensor {
        self.zip_map(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Tensor) -> Tensor {
        self.zip_map(other, |a, b| a - b)
    }

    /// Element-wise product A⊙B.
    pub fn hadamard(&self, other: &Tensor) -> Tensor {
        self.zip_map(other, |a, b| a * b)
    }

    pub fn scale(&self, scalar: f64) -> Tensor {
        self.map(|x| x * scalar)
    }

    /// In-place `self += other`.
    pub fn add_assign(&mut self, other: &Tensor) {
        assert_eq!(self.shape(), other.shape(), "Shape mismatch for add_assign");
        for (a, b) in self.data.iter_mut().zip(&other.data) {
            *a += b;
        }
    }

    /// In-place `self += alpha * x`.
    pub fn axpy(&mut self, alpha: f64, x: &Tensor) {
        assert_eq!(self.shape(), x.shape(), "Shape mismatch for axpy");
        for (a, b) in self.data.iter_mut().zip(&x.data) {
            *a += alpha * b;
        }
    }

    // ========================================================================
    // Columns
    // ========================================================================

    /// Sum across columns, giving a rows×1 vector.
    pub fn sum_columns(&self) -> Tensor {
        let mut result = Tensor::zeros(self.rows, 1);
        for i in 0..self.rows {
            result.data[i] = self.data[i * self.cols..(i + 1) * self.cols].iter().sum();
        }
        result
    }

    /// Add a rows×1 vector to every column.
    pub fn add_column(&self, column: &Tensor) -> Tensor {
        assert!(
            column.cols == 1 && column.rows == self.rows,
            "Cannot broadcast {} over {}",
            column.shape(),
            self.shape()
        );
        let mut result = self.clone();
        for i in 0..self.rows {
            for j in 0..self.cols {
                result.data[i * self.cols + j] += column.data[i];
            }
        }
        result
    }

    /// Copy out column `j` as a rows×1 vector.
    pub fn column_at(&self, j: usize) -> Tensor {
        assert!(j < self.cols, "Column {} out of range for {}", j, self.shape());
        Tensor::column((0..self.rows).map(|i| self.data[i * self.cols + j]).collect())
    }

    /// Overwrite column `j` with a rows×1 vector.
    pub fn set_column(&mut self, j: usize, column: &Tensor) {
        assert!(j < self.cols, "Column {} out of range for {}", j, self.shape());
        assert_eq!(column.shape(), Shape::column(self.rows), "Column shape mismatch");
        for i in 0..self.rows {
            self.data[i * self.cols + j] = column.data[i];
        }
    }

    /// Zero every listed column.
    pub fn zero_columns(&mut self, columns: &[usize]) {
        for &j in columns {
            assert!(j < self.cols, "Column {} out of range for {}", j, self.shape());
            for i in 0..self.rows {
                self.data[i * self.cols + j] = 0.0;
            }
        }
    }

    // ========================================================================
    // Reductions
    // ========================================================================

    /// Euclidean (Frobenius) norm.
    pub fn norm(&self) -> f64 {
        self.data.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// A copy scaled to unit norm. The zero tensor is returned unchanged.
    pub fn normalized(&self) -> Tensor {
        let norm = self.norm();
        if norm > 0.0 {
            self.scale(1.0 / norm)
        } else {
            self.clone()
        }
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cols == 1 {
            write!(f, "Tensor(col[{}]={:?})", self.rows, self.data)
        } else {
            write!(f, "Tensor(shape={}, data={:?})", self.shape(), self.data)
        }
    }
}
