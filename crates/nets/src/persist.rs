//! Saving and loading trained encoders as JSON.
//!
//! A saved model records the embedding dimension, the training settings,
//! the vocabulary with its vectors, and the cell parameters: per-role
//! weights and biases (plus `W_m` for the tied tree), or gate matrices for
//! the LSTM variants. Floats are written with enough digits to reload
//! bit-identically, and every map is ordered, so saving a loaded model
//! reproduces the same bytes.
//!
//! The parser or tokenizer is not part of the record; it is handed back in
//! on load. A record with a NaN or infinite parameter is refused on save,
//! since JSON would write it as `null`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use recursive_diff::Tensor;
use recursive_nlp::{DependencyParser, Tokenizer};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::cell::{ChainCell, TreeCell};
use crate::chain::{ChainNetwork, OutputLayer};
use crate::config::NetConfig;
use crate::embeddings::EmbeddingTable;
use crate::error::NetError;
use crate::tree::TreeNetwork;

/// The on-disk form of an encoder with parameters `P`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord<P> {
    pub dim: usize,
    pub clip_norm: f64,
    pub seed: u64,
    pub vocab: Vec<String>,
    pub vectors: BTreeMap<String, Tensor>,
    pub params: P,
}

impl<P> ModelRecord<P> {
    fn new(config: &NetConfig, embeddings: EmbeddingTable, params: P) -> Self {
        let (dim, vocab, vectors) = embeddings.into_parts();
        Self {
            dim,
            clip_norm: config.clip_norm,
            seed: config.seed,
            vocab,
            vectors,
            params,
        }
    }

    /// Config and embedding table described by the record.
    fn split(self) -> Result<(NetConfig, EmbeddingTable, P), NetError> {
        let config = NetConfig::new(self.dim)
            .with_clip_norm(self.clip_norm)
            .with_seed(self.seed);
        let embeddings = EmbeddingTable::from_parts(self.dim, self.vocab, self.vectors)?;
        Ok((config, embeddings, self.params))
    }
}

impl<P: Serialize> ModelRecord<P> {
    /// Fails with [`NetError::NonFiniteParameter`] naming the first entry
    /// that is NaN or infinite.
    pub fn check_finite(&self) -> Result<(), NetError> {
        // records hold no optional fields, so a null can only be a
        // non-finite float
        let value = serde_json::to_value(self)?;
        let mut path = String::new();
        if find_null(&value, &mut path) {
            return Err(NetError::NonFiniteParameter { path });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, NetError> {
        self.check_finite()?;
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), NetError> {
        self.check_finite()?;
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        info!(path = %path.display(), vocab = self.vocab.len(), "saved model");
        Ok(())
    }
}

impl<P: DeserializeOwned> ModelRecord<P> {
    pub fn from_json(json: &str) -> Result<Self, NetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, NetError> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let record: Self = serde_json::from_reader(reader)?;
        info!(path = %path.display(), vocab = record.vocab.len(), "loaded model");
        Ok(record)
    }
}

/// Depth-first search for a null, leaving its location in `path`.
fn find_null(value: &Value, path: &mut String) -> bool {
    let len = path.len();
    let found = match value {
        Value::Null => return true,
        Value::Array(items) => items.iter().enumerate().any(|(i, item)| {
            path.truncate(len);
            path.push_str(&format!("[{}]", i));
            find_null(item, path)
        }),
        Value::Object(fields) => fields.iter().any(|(key, field)| {
            path.truncate(len);
            if !path.is_empty() {
                path.push('.');
            }
            path.push_str(key);
            find_null(field, path)
        }),
        _ => false,
    };
    if !found {
        path.truncate(len);
    }
    found
}

/// Stored parameters of a chain encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainParams<C> {
    pub cell: C,
    pub output: OutputLayer,
}

impl<C> TreeNetwork<C>
where
    C: TreeCell + Clone + Serialize + DeserializeOwned,
{
    pub fn to_record(&self) -> ModelRecord<C> {
        ModelRecord::new(self.config(), self.embeddings().clone(), self.cell().clone())
    }

    pub fn from_record(
        record: ModelRecord<C>,
        parser: Arc<dyn DependencyParser>,
    ) -> Result<Self, NetError> {
        let (config, embeddings, cell) = record.split()?;
        Self::from_parts(config, embeddings, cell, parser)
    }

    pub fn to_json(&self) -> Result<String, NetError> {
        self.to_record().to_json()
    }

    pub fn from_json(json: &str, parser: Arc<dyn DependencyParser>) -> Result<Self, NetError> {
        Self::from_record(ModelRecord::from_json(json)?, parser)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), NetError> {
        self.to_record().save(path)
    }

    pub fn load(path: impl AsRef<Path>, parser: Arc<dyn DependencyParser>) -> Result<Self, NetError> {
        Self::from_record(ModelRecord::load(path)?, parser)
    }
}

impl<C> ChainNetwork<C>
where
    C: ChainCell + Clone + Serialize + DeserializeOwned,
{
    pub fn to_record(&self) -> ModelRecord<ChainParams<C>> {
        let params = ChainParams {
            cell: self.cell().clone(),
            output: self.output_layer().clone(),
        };
        ModelRecord::new(self.config(), self.embeddings().clone(), params)
    }

    pub fn from_record(
        record: ModelRecord<ChainParams<C>>,
        tokenizer: Arc<dyn Tokenizer>,
    ) -> Result<Self, NetError> {
        let (config, embeddings, params) = record.split()?;
        Self::from_parts(config, embeddings, params.cell, params.output, tokenizer)
    }

    pub fn to_json(&self) -> Result<String, NetError> {
        self.to_record().to_json()
    }

    pub fn from_json(json: &str, tokenizer: Arc<dyn Tokenizer>) -> Result<Self, NetError> {
        Self::from_record(ModelRecord::from_json(json)?, tokenizer)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), NetError> {
        self.to_record().save(path)
    }

    pub fn load(path: impl AsRef<Path>, tokenizer: Arc<dyn Tokenizer>) -> Result<Self, NetError> {
        Self::from_record(ModelRecord::load(path)?, tokenizer)
    }
}
