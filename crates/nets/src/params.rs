//! # Role Parameters
//!
//! Tree encoders tie their weights by dependency relation: every `amod` edge
//! in every sentence uses the same matrix and bias. [`ParamStore`] holds those
//! per-role parameters, and [`RoleGradients`] collects their gradients during
//! a backward pass.
//!
//! ## Normalization
//!
//! A role used by k edges in one tree receives k gradient contributions. The
//! update divides their sum by k, so a sentence with many adjectives does
//! not move the `amod` parameters further than a sentence with one.

use std::collections::BTreeMap;

use recursive_core::{CoreError, Shape};
use recursive_diff::Tensor;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Weight matrix and bias of one dependency role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleParams {
    pub weight: Tensor,
    pub bias: Tensor,
}

impl RoleParams {
    /// Zero D×D weight and zero D×1 bias.
    pub fn zeros(dim: usize) -> Self {
        Self {
            weight: Tensor::zeros(dim, dim),
            bias: Tensor::zeros(dim, 1),
        }
    }

    pub fn check_shapes(&self, dim: usize) -> Result<(), CoreError> {
        self.weight.expect_shape(dim, dim)?;
        self.bias.expect_shape(dim, 1)
    }
}

/// Per-role parameters, ordered by role name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamStore {
    dim: usize,
    roles: BTreeMap<String, RoleParams>,
}

impl ParamStore {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            roles: BTreeMap::new(),
        }
    }

    /// One entry per label, with weights from `weight` and zero biases.
    pub fn for_labels(dim: usize, labels: &[&str], mut weight: impl FnMut() -> Tensor) -> Self {
        let mut store = Self::new(dim);
        for &label in labels {
            store.insert(
                label,
                RoleParams {
                    weight: weight(),
                    bias: Tensor::zeros(dim, 1),
                },
            );
        }
        store
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn get(&self, role: &str) -> Option<&RoleParams> {
        self.roles.get(role)
    }

    pub fn get_mut(&mut self, role: &str) -> Option<&mut RoleParams> {
        self.roles.get_mut(role)
    }

    /// Parameters for `role`, created as zeros on first use.
    pub fn get_or_insert_zero(&mut self, role: &str) -> &mut RoleParams {
        let dim = self.dim;
        if !self.roles.contains_key(role) {
            debug!(role, "creating parameters for unseen role");
        }
        self.roles
            .entry(role.to_string())
            .or_insert_with(|| RoleParams::zeros(dim))
    }

    pub fn insert(&mut self, role: impl Into<String>, params: RoleParams) -> Option<RoleParams> {
        self.roles.insert(role.into(), params)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.roles.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RoleParams)> {
        self.roles.iter().map(|(role, params)| (role.as_str(), params))
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn check_shapes(&self, dim: usize) -> Result<(), CoreError> {
        if self.dim != dim {
            return Err(CoreError::ShapeMismatch {
                expected: Shape::square(dim),
                got: Shape::square(self.dim),
            });
        }
        self.roles.values().try_for_each(|p| p.check_shapes(dim))
    }
}

/// Summed gradients of one role and how many edges contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct RoleGradSum {
    /// `None` for encoders whose role weights are fixed
    pub weight: Option<Tensor>,
    pub bias: Tensor,
    pub count: usize,
}

/// A role's gradient divided by its usage count.
#[derive(Debug, Clone, PartialEq)]
pub struct AveragedRole {
    pub role: String,
    pub weight: Option<Tensor>,
    pub bias: Tensor,
    pub count: usize,
}

/// Per-role gradient sums for one backward pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleGradients {
    sums: BTreeMap<String, RoleGradSum>,
}

impl RoleGradients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one edge's contribution to `role`.
    pub fn accumulate(&mut self, role: &str, weight: Option<Tensor>, bias: &Tensor) {
        match self.sums.get_mut(role) {
            Some(sum) => {
                if let (Some(total), Some(w)) = (sum.weight.as_mut(), weight.as_ref()) {
                    total.add_assign(w);
                }
                sum.bias.add_assign(bias);
                sum.count += 1;
            }
            None => {
                self.sums.insert(
                    role.to_string(),
                    RoleGradSum {
                        weight,
                        bias: bias.clone(),
                        count: 1,
                    },
                );
            }
        }
    }

    pub fn get(&self, role: &str) -> Option<&RoleGradSum> {
        self.sums.get(role)
    }

    pub fn weight_sum(&self, role: &str) -> Option<&Tensor> {
        self.sums.get(role).and_then(|s| s.weight.as_ref())
    }

    pub fn bias_sum(&self, role: &str) -> Option<&Tensor> {
        self.sums.get(role).map(|s| &s.bias)
    }

    /// Number of edges that used `role`; zero if none did.
    pub fn count(&self, role: &str) -> usize {
        self.sums.get(role).map_or(0, |s| s.count)
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.sums.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// Sum divided by count for every role that was used.
    pub fn averaged(&self) -> Vec<AveragedRole> {
        self.sums
            .iter()
            .filter(|(_, sum)| sum.count > 0)
            .map(|(role, sum)| {
                let k = sum.count as f64;
                AveragedRole {
                    role: role.clone(),
                    weight: sum.weight.as_ref().map(|w| w.map(|x| x / k)),
                    bias: sum.bias.map(|x| x / k),
                    count: sum.count,
                }
            })
            .collect()
    }
}
