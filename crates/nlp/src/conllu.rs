//! # CoNLL-U Treebanks
//!
//! Pre-parsed sentences in the tab-separated CoNLL-U format, used as a
//! [`DependencyParser`] that answers from memory. Each sentence is a block of
//! token lines ended by a blank line:
//!
//! ```text
//! # text = The cat sat.
//! 1   The   the   DET    _  _  2  det    _  _
//! 2   cat   cat   NOUN   _  _  3  nsubj  _  _
//! 3   sat   sit   VERB   _  _  0  root   _  _
//! 4   .     .     PUNCT  _  _  3  punct  _  _
//! ```
//!
//! Only the ID, FORM, HEAD and DEPREL columns are read. IDs and heads are
//! 1-based with head 0 marking the root; tokens come out 0-based with the
//! root pointing at itself. Multiword ranges (`1-2`) and empty nodes (`1.1`)
//! are skipped.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::NlpError;
use crate::labels::normalize_label;
use crate::parser::{sentence_key, DependencyParser, Tokenizer, WhitespaceTokenizer};
use crate::token::{link_children, Token};

const ID: usize = 0;
const FORM: usize = 1;
const HEAD: usize = 6;
const DEPREL: usize = 7;

/// A sentence read from a treebank.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSentence {
    /// The `# text =` comment, or the forms joined by spaces
    pub text: String,
    pub tokens: Vec<Token>,
}

/// A token line waiting for its sentence to finish.
struct PendingToken {
    line: usize,
    form: String,
    head: usize,
    dep: String,
}

/// Read every sentence in `input`.
pub fn parse_conllu(input: &str) -> Result<Vec<ParsedSentence>, NlpError> {
    let mut sentences = Vec::new();
    let mut text: Option<String> = None;
    let mut pending: Vec<PendingToken> = Vec::new();

    for (offset, raw) in input.lines().enumerate() {
        let line = offset + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            if !pending.is_empty() {
                sentences.push(finish_sentence(text.take(), std::mem::take(&mut pending))?);
            }
            text = None;
            continue;
        }
        if let Some(comment) = trimmed.strip_prefix('#') {
            if let Some(value) = comment.trim_start().strip_prefix("text") {
                if let Some(value) = value.trim_start().strip_prefix('=') {
                    text = Some(value.trim().to_string());
                }
            }
            continue;
        }

        let mut fields: Vec<&str> = trimmed.split('\t').collect();
        if fields.len() == 1 {
            fields = trimmed.split_whitespace().collect();
        }
        if fields.len() <= DEPREL {
            return Err(NlpError::MalformedLine {
                line,
                reason: format!("expected at least {} columns, found {}", DEPREL + 1, fields.len()),
            });
        }

        let id = fields[ID].trim();
        if id.contains('-') || id.contains('.') {
            continue;
        }
        let id: usize = id.parse().map_err(|_| NlpError::MalformedLine {
            line,
            reason: format!("token id '{}' is not a number", fields[ID]),
        })?;
        if id != pending.len() + 1 {
            return Err(NlpError::MalformedLine {
                line,
                reason: format!("expected token id {}, found {}", pending.len() + 1, id),
            });
        }
        let head: usize = fields[HEAD].trim().parse().map_err(|_| NlpError::MalformedLine {
            line,
            reason: format!("head '{}' is not a number", fields[HEAD]),
        })?;

        pending.push(PendingToken {
            line,
            form: fields[FORM].trim().to_string(),
            head,
            dep: normalize_label(fields[DEPREL].trim()).to_string(),
        });
    }
    if !pending.is_empty() {
        sentences.push(finish_sentence(text, pending)?);
    }
    Ok(sentences)
}

fn finish_sentence(text: Option<String>, pending: Vec<PendingToken>) -> Result<ParsedSentence, NlpError> {
    let len = pending.len();
    let mut tokens = Vec::with_capacity(len);
    for (idx, tok) in pending.into_iter().enumerate() {
        let head = match tok.head {
            0 => idx,
            h if h <= len => h - 1,
            h => return Err(NlpError::UnknownHead { line: tok.line, head: h }),
        };
        tokens.push(Token::new(idx, tok.form, head, tok.dep));
    }
    link_children(&mut tokens)?;
    let text = text.unwrap_or_else(|| {
        tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    });
    Ok(ParsedSentence { text, tokens })
}

/// An in-memory collection of parses, looked up by sentence text.
///
/// Lookups ignore differences in whitespace. A sentence that is not stored
/// verbatim is also tried in its tokenized spelling, so `"The cat sat."`
/// finds a parse stored as `"The cat sat ."`.
#[derive(Debug, Clone, Default)]
pub struct Treebank {
    parses: HashMap<String, Vec<Token>>,
}

impl Treebank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every sentence of a CoNLL-U document.
    pub fn from_conllu(input: &str) -> Result<Self, NlpError> {
        let mut treebank = Self::new();
        for sentence in parse_conllu(input)? {
            treebank.store(&sentence.text, sentence.tokens);
        }
        debug!(sentences = treebank.len(), "loaded treebank");
        Ok(treebank)
    }

    /// Load a CoNLL-U file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, NlpError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|e| NlpError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_conllu(&input)
    }

    /// Add a parse, validating its tree and filling in dependents.
    pub fn insert(&mut self, sentence: &str, mut tokens: Vec<Token>) -> Result<(), NlpError> {
        if tokens.is_empty() {
            return Err(NlpError::EmptySentence);
        }
        link_children(&mut tokens)?;
        self.store(sentence, tokens);
        Ok(())
    }

    fn store(&mut self, sentence: &str, tokens: Vec<Token>) {
        if self.parses.insert(sentence_key(sentence), tokens).is_some() {
            warn!(sentence, "replaced an existing parse");
        }
    }

    pub fn len(&self) -> usize {
        self.parses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parses.is_empty()
    }

    /// The stored parse of `sentence`, if any.
    pub fn get(&self, sentence: &str) -> Option<&[Token]> {
        self.parses
            .get(&sentence_key(sentence))
            .or_else(|| {
                let tokenized = WhitespaceTokenizer.tokenize(sentence).join(" ");
                self.parses.get(&tokenized)
            })
            .map(Vec::as_slice)
    }

    /// Texts of every stored sentence, in no particular order.
    pub fn sentences(&self) -> impl Iterator<Item = &str> {
        self.parses.keys().map(String::as_str)
    }

    /// Every stored parse, in no particular order.
    pub fn parses(&self) -> impl Iterator<Item = &[Token]> {
        self.parses.values().map(Vec::as_slice)
    }
}

impl DependencyParser for Treebank {
    fn parse(&self, sentence: &str) -> Result<Vec<Token>, NlpError> {
        if sentence.trim().is_empty() {
            return Err(NlpError::EmptySentence);
        }
        self.get(sentence)
            .map(<[Token]>::to_vec)
            .ok_or_else(|| NlpError::UnparsedSentence {
                sentence: sentence.to_string(),
            })
    }
}

impl Tokenizer for Treebank {
    /// Stored parses give their own forms; anything else is split on
    /// whitespace.
    fn tokenize(&self, sentence: &str) -> Vec<String> {
        match self.get(sentence) {
            Some(tokens) => tokens.iter().map(|t| t.text.clone()).collect(),
            None => WhitespaceTokenizer.tokenize(sentence),
        }
    }
}
