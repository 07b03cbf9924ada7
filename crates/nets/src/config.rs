//! Encoder configuration.
//!
//! Every encoder is built from a [`NetConfig`]. It fixes the embedding
//! dimension, the gradient norm ceiling, the seed for parameter
//! initialization and where the word vectors come from. Configs are plain
//! serde values, so they can be read from JSON with any field omitted.

use std::collections::HashMap;
use std::path::Path;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use recursive_diff::DEFAULT_CLIP_NORM;
use serde::{Deserialize, Serialize};

use crate::error::NetError;

/// Where initial word vectors come from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum EmbeddingInit {
    /// Random unit vectors
    #[default]
    Random,
    /// Vectors keyed by word. Words without one fall back to a random unit
    /// vector.
    Pretrained(HashMap<String, Vec<f64>>),
}

/// Encoder configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Embedding dimension D
    pub dim: usize,

    /// Gradients are rescaled to at most this L2 norm
    pub clip_norm: f64, // default: 5.0

    /// Seed for parameter and embedding initialization
    pub seed: u64, // default: 1234

    pub init: EmbeddingInit,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            dim: 50,
            clip_norm: DEFAULT_CLIP_NORM,
            seed: 1234,
            init: EmbeddingInit::Random,
        }
    }
}

impl NetConfig {
    /// Defaults with the given embedding dimension.
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_clip_norm(mut self, clip_norm: f64) -> Self {
        self.clip_norm = clip_norm;
        self
    }

    pub fn with_pretrained(mut self, vectors: HashMap<String, Vec<f64>>) -> Self {
        self.init = EmbeddingInit::Pretrained(vectors);
        self
    }

    /// Parse and validate a JSON config.
    pub fn from_json(json: &str) -> Result<Self, NetError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NetError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn validate(&self) -> Result<(), NetError> {
        if self.dim == 0 {
            return Err(NetError::InvalidConfig {
                reason: "embedding dimension must be positive".to_string(),
            });
        }
        if self.clip_norm.is_nan() || self.clip_norm <= 0.0 {
            return Err(NetError::InvalidConfig {
                reason: format!("clip norm must be positive, got {}", self.clip_norm),
            });
        }
        Ok(())
    }

    /// A fresh generator seeded from this config.
    pub fn rng(&self) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(self.seed)
    }
}
