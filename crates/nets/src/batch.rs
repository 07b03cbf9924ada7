//! Left-padded batches for the chain encoders.
//!
//! Sentences of different lengths are aligned on their last word, so every
//! sentence ends at the final time step and the last hidden state is its
//! embedding:
//!
//! ```text
//!          t=0   t=1   t=2   t=3
//! row 0    PAD   PAD   dogs  bark
//! row 1    the   cat   sat   .
//! ```
//!
//! A PAD slot reads as the zero vector whatever the embedding table holds,
//! and never receives a word gradient.

use recursive_diff::Tensor;

use crate::embeddings::EmbeddingTable;
use crate::error::NetError;

/// One position of a padded batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Slot {
    Pad,
    /// A lowercased word
    Word(String),
}

impl Slot {
    pub fn word(&self) -> Option<&str> {
        match self {
            Slot::Pad => None,
            Slot::Word(w) => Some(w),
        }
    }

    pub fn is_pad(&self) -> bool {
        matches!(self, Slot::Pad)
    }
}

/// A rectangular batch of `size` sentences over `seq_len` time steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// One row per sentence
    rows: Vec<Vec<Slot>>,
    seq_len: usize,
}

impl Batch {
    /// Left-pad tokenized sentences to the length of the longest.
    ///
    /// Fails with [`NetError::EmptyBatch`] when there is no sentence or no
    /// sentence has a word.
    pub fn left_padded(sentences: Vec<Vec<String>>) -> Result<Self, NetError> {
        let seq_len = sentences.iter().map(Vec::len).max().unwrap_or(0);
        if seq_len == 0 {
            return Err(NetError::EmptyBatch);
        }
        let rows = sentences
            .into_iter()
            .map(|words| {
                let pad = seq_len - words.len();
                std::iter::repeat(Slot::Pad)
                    .take(pad)
                    .chain(words.into_iter().map(|w| Slot::Word(w.to_lowercase())))
                    .collect()
            })
            .collect();
        Ok(Self { rows, seq_len })
    }

    /// Number of sentences, B.
    pub fn size(&self) -> usize {
        self.rows.len()
    }

    /// Number of time steps, T.
    pub fn seq_len(&self) -> usize {
        self.seq_len
    }

    pub fn slot(&self, row: usize, t: usize) -> &Slot {
        &self.rows[row][t]
    }

    /// The slots of every sentence at time step `t`.
    pub fn slots_at(&self, t: usize) -> impl Iterator<Item = &Slot> + '_ {
        self.rows.iter().map(move |row| &row[t])
    }

    /// D×B input matrix for time step `t`. PAD and unknown words are zero
    /// columns.
    pub fn inputs_at(&self, t: usize, embeddings: &EmbeddingTable) -> Tensor {
        let mut x = Tensor::zeros(embeddings.dim(), self.size());
        for (b, slot) in self.slots_at(t).enumerate() {
            if let Some(vector) = slot.word().and_then(|w| embeddings.get(w)) {
                x.set_column(b, vector);
            }
        }
        x
    }

    /// Columns that are still PAD at time step `t`. Left padding means a
    /// sentence is PAD at `t` only if it is PAD at every earlier step.
    pub fn pad_columns(&self, t: usize) -> Vec<usize> {
        self.slots_at(t)
            .enumerate()
            .filter(|(_, slot)| slot.is_pad())
            .map(|(b, _)| b)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn words(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_left_padding() {
        let batch = Batch::left_padded(vec![words("dogs bark"), words("The cat sat .")]).unwrap();
        assert_eq!(batch.size(), 2);
        assert_eq!(batch.seq_len(), 4);
        assert!(batch.slot(0, 0).is_pad());
        assert!(batch.slot(0, 1).is_pad());
        assert_eq!(batch.slot(0, 2).word(), Some("dogs"));
        assert_eq!(batch.slot(1, 0).word(), Some("the"));
        assert_eq!(batch.pad_columns(0), vec![0]);
        assert_eq!(batch.pad_columns(1), vec![0]);
        assert!(batch.pad_columns(2).is_empty());
    }

    #[test]
    fn test_empty_batch() {
        assert!(matches!(Batch::left_padded(vec![]), Err(NetError::EmptyBatch)));
        assert!(matches!(
            Batch::left_padded(vec![vec![], vec![]]),
            Err(NetError::EmptyBatch)
        ));
    }

    #[test]
    fn test_inputs_zero_for_pad_and_unknown() {
        let vocab = vec!["cat".to_string()];
        let table = EmbeddingTable::random(3, &vocab, &mut ChaCha8Rng::seed_from_u64(1));
        let batch = Batch::left_padded(vec![words("cat"), words("dog cat")]).unwrap();

        let x0 = batch.inputs_at(0, &table);
        assert_eq!(x0, Tensor::zeros(3, 2));

        let x1 = batch.inputs_at(1, &table);
        assert_eq!(&x1.column_at(0), table.get("cat").unwrap());
        assert_eq!(&x1.column_at(1), table.get("cat").unwrap());
    }
}
