//! # Gradient Checking
//!
//! Hand-written backward passes are verified against central differences:
//! perturb one parameter entry by ±δ, rerun the cost, and compare the slope
//! with the analytic gradient at that entry.
//!
//! ## Example
//!
//! ```rust
//! use recursive_diff::gradcheck::GradCheck;
//!
//! // cost(w) = w³, so d cost / dw = 3w²
//! let check = GradCheck::default();
//! let w = 0.7;
//! check.check("w", 0, 3.0 * w * w, w, |v| v * v * v).unwrap();
//! ```

use std::fmt;

/// Perturbation used by [`GradCheck::default`].
pub const DEFAULT_DELTA: f64 = 1e-5;

/// `(cost(value + δ) − cost(value − δ)) / 2δ`.
pub fn central_difference(mut cost_at: impl FnMut(f64) -> f64, value: f64, delta: f64) -> f64 {
    let plus = cost_at(value + delta);
    let minus = cost_at(value - delta);
    (plus - minus) / (2.0 * delta)
}

/// True when `|a − b| ≤ atol + rtol·|b|`.
pub fn allclose(a: f64, b: f64, rtol: f64, atol: f64) -> bool {
    (a - b).abs() <= atol + rtol * b.abs()
}

/// Tolerances for comparing analytic and numerical gradients.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradCheck {
    pub delta: f64,
    pub rtol: f64,
    pub atol: f64,
}

impl Default for GradCheck {
    fn default() -> Self {
        Self {
            delta: DEFAULT_DELTA,
            rtol: 1e-4,
            atol: 1e-7,
        }
    }
}

impl GradCheck {
    /// Compare `analytic` with the central difference of `cost_at` around
    /// `value`. The caller restores the parameter entry afterwards.
    pub fn check(
        &self,
        param: &str,
        index: usize,
        analytic: f64,
        value: f64,
        cost_at: impl FnMut(f64) -> f64,
    ) -> Result<f64, GradCheckError> {
        let numerical = central_difference(cost_at, value, self.delta);
        self.compare(param, index, analytic, numerical)?;
        Ok(numerical)
    }

    /// Compare two gradient values under this check's tolerances.
    pub fn compare(
        &self,
        param: &str,
        index: usize,
        analytic: f64,
        numerical: f64,
    ) -> Result<(), GradCheckError> {
        if allclose(analytic, numerical, self.rtol, self.atol) {
            Ok(())
        } else {
            Err(GradCheckError {
                param: param.to_string(),
                index,
                analytical: analytic,
                numerical,
                diff: (analytic - numerical).abs(),
            })
        }
    }
}

/// An analytic gradient entry that disagrees with its numerical estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct GradCheckError {
    pub param: String,
    pub index: usize,
    pub analytical: f64,
    pub numerical: f64,
    pub diff: f64,
}

impl fmt::Display for GradCheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Gradient mismatch at {}[{}]: analytical={}, numerical={}, diff={}",
            self.param, self.index, self.analytical, self.numerical, self.diff
        )
    }
}

impl std::error::Error for GradCheckError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_central_difference_of_square() {
        let slope = central_difference(|x| x * x, 3.0, DEFAULT_DELTA);
        assert!((slope - 6.0).abs() < 1e-8);
    }

    #[test]
    fn test_allclose() {
        assert!(allclose(1.0, 1.00001, 1e-4, 0.0));
        assert!(!allclose(1.0, 1.1, 1e-4, 1e-7));
        assert!(allclose(1e-9, 0.0, 1e-4, 1e-7));
    }

    #[test]
    fn test_check_reports_mismatch() {
        let check = GradCheck::default();
        let err = check.check("w", 3, 1.0, 2.0, |x| x * x).unwrap_err();
        assert_eq!(err.param, "w");
        assert_eq!(err.index, 3);
        assert!((err.numerical - 4.0).abs() < 1e-6);
        assert!(err.to_string().contains("w[3]"));
    }

    #[test]
    fn test_check_accepts_matching_gradient() {
        let check = GradCheck::default();
        let numerical = check.check("b", 0, 2.0_f64.cos(), 2.0, f64::sin).unwrap();
        assert!((numerical - 2.0_f64.cos()).abs() < 1e-9);
    }
}
