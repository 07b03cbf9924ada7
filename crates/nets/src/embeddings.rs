//! # Word Embeddings
//!
//! Each encoder keeps one trainable D×1 vector per vocabulary word. Lookups
//! lowercase the word first. A word outside the vocabulary reads as the zero
//! vector and never receives an update.

use std::collections::{BTreeMap, HashMap};

use rand::Rng;
use recursive_diff::init::random_unit_vector;
use recursive_diff::{Sgd, Tensor};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{EmbeddingInit, NetConfig};
use crate::error::NetError;

/// Trainable word vectors keyed by lowercased word.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingTable {
    dim: usize,
    vocab: Vec<String>,
    vectors: BTreeMap<String, Tensor>,
}

/// Lowercase, sort and deduplicate a word list.
fn normalize_vocab(vocab: &[String]) -> Vec<String> {
    let mut words: Vec<String> = vocab.iter().map(|w| w.to_lowercase()).collect();
    words.sort_unstable();
    words.dedup();
    words
}

impl EmbeddingTable {
    /// A random unit vector for every word.
    pub fn random<R: Rng + ?Sized>(dim: usize, vocab: &[String], rng: &mut R) -> Self {
        let vocab = normalize_vocab(vocab);
        let vectors = vocab
            .iter()
            .map(|w| (w.clone(), random_unit_vector(dim, rng)))
            .collect();
        Self { dim, vocab, vectors }
    }

    /// Pretrained vectors where available, random unit vectors elsewhere.
    pub fn from_pretrained<R: Rng + ?Sized>(
        dim: usize,
        vocab: &[String],
        pretrained: &HashMap<String, Vec<f64>>,
        rng: &mut R,
    ) -> Result<Self, NetError> {
        let vocab = normalize_vocab(vocab);
        let mut vectors = BTreeMap::new();
        let mut missing = 0usize;
        for word in &vocab {
            let vector = match pretrained.get(word) {
                Some(values) if values.len() == dim => Tensor::column(values.clone()),
                Some(values) => {
                    return Err(NetError::PretrainedDimension {
                        word: word.clone(),
                        expected: dim,
                        got: values.len(),
                    })
                }
                None => {
                    missing += 1;
                    random_unit_vector(dim, rng)
                }
            };
            vectors.insert(word.clone(), vector);
        }
        if missing > 0 {
            warn!(missing, total = vocab.len(), "words without pretrained vectors were randomly initialized");
        }
        Ok(Self { dim, vocab, vectors })
    }

    /// Build the table a config asks for.
    pub fn from_config<R: Rng + ?Sized>(
        config: &NetConfig,
        vocab: &[String],
        rng: &mut R,
    ) -> Result<Self, NetError> {
        match &config.init {
            EmbeddingInit::Random => Ok(Self::random(config.dim, vocab, rng)),
            EmbeddingInit::Pretrained(map) => Self::from_pretrained(config.dim, vocab, map, rng),
        }
    }

    /// Rebuild a table from stored parts, validating them.
    pub fn from_parts(
        dim: usize,
        vocab: Vec<String>,
        vectors: BTreeMap<String, Tensor>,
    ) -> Result<Self, NetError> {
        let table = Self { dim, vocab, vectors };
        table.validate()?;
        Ok(table)
    }

    /// Split into dimension, vocabulary and vectors.
    pub fn into_parts(self) -> (usize, Vec<String>, BTreeMap<String, Tensor>) {
        (self.dim, self.vocab, self.vectors)
    }

    /// Check that every vocabulary word has a D×1 vector and nothing else
    /// does.
    pub fn validate(&self) -> Result<(), NetError> {
        if self.vocab.len() != self.vectors.len() {
            return Err(NetError::InvalidConfig {
                reason: format!(
                    "{} vocabulary words but {} vectors",
                    self.vocab.len(),
                    self.vectors.len()
                ),
            });
        }
        for word in &self.vocab {
            match self.vectors.get(word) {
                Some(v) => v.expect_shape(self.dim, 1)?,
                None => {
                    return Err(NetError::InvalidConfig {
                        reason: format!("no vector for vocabulary word '{}'", word),
                    })
                }
            }
        }
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn vocab(&self) -> &[String] {
        &self.vocab
    }

    pub fn len(&self) -> usize {
        self.vocab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocab.is_empty()
    }

    /// Whether `word` (already lowercased) has a vector.
    pub fn contains(&self, word: &str) -> bool {
        self.vectors.contains_key(word)
    }

    /// The vector of `word` (already lowercased), if it has one.
    pub fn get(&self, word: &str) -> Option<&Tensor> {
        self.vectors.get(word)
    }

    pub fn get_mut(&mut self, word: &str) -> Option<&mut Tensor> {
        self.vectors.get_mut(word)
    }

    /// The vector of `word` after lowercasing, or zeros for an unknown
    /// word. The flag says whether the word was known.
    pub fn lookup_known(&self, word: &str) -> (Tensor, bool) {
        match self.vectors.get(&word.to_lowercase()) {
            Some(v) => (v.clone(), true),
            None => (Tensor::zeros(self.dim, 1), false),
        }
    }

    /// The vector of `word` after lowercasing, or zeros for an unknown word.
    pub fn lookup(&self, word: &str) -> Tensor {
        self.lookup_known(word).0
    }

    /// Set the vector of `word`, adding it to the vocabulary if needed.
    pub fn insert(&mut self, word: &str, vector: Tensor) -> Result<(), NetError> {
        vector.expect_shape(self.dim, 1)?;
        let word = word.to_lowercase();
        if let Err(pos) = self.vocab.binary_search(&word) {
            self.vocab.insert(pos, word.clone());
        }
        self.vectors.insert(word, vector);
        Ok(())
    }

    /// Gradient step on every known word in `grads`, dividing each word's
    /// summed gradient by its occurrence count. Returns how many vectors
    /// moved.
    pub fn apply_gradients(&mut self, grads: &WordGradients, rate: f64) -> usize {
        let sgd = Sgd::new(rate);
        let mut updated = 0;
        for (word, sum, count) in grads.iter() {
            if count == 0 {
                continue;
            }
            if let Some(vector) = self.vectors.get_mut(word) {
                sgd.step_averaged(vector, sum, count);
                updated += 1;
            }
        }
        debug!(updated, "applied word gradients");
        updated
    }
}

/// Summed word-vector gradients for one backward pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WordGradients {
    sums: BTreeMap<String, (Tensor, usize)>,
}

impl WordGradients {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the gradient of one occurrence of `word`.
    pub fn add(&mut self, word: &str, grad: Tensor) {
        match self.sums.get_mut(word) {
            Some((sum, count)) => {
                sum.add_assign(&grad);
                *count += 1;
            }
            None => {
                self.sums.insert(word.to_string(), (grad, 1));
            }
        }
    }

    pub fn get(&self, word: &str) -> Option<&Tensor> {
        self.sums.get(word).map(|(sum, _)| sum)
    }

    pub fn count(&self, word: &str) -> usize {
        self.sums.get(word).map_or(0, |(_, count)| *count)
    }

    pub fn len(&self) -> usize {
        self.sums.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }

    /// `(word, summed gradient, occurrences)` in word order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tensor, usize)> {
        self.sums
            .iter()
            .map(|(word, (sum, count))| (word.as_str(), sum, *count))
    }
}
