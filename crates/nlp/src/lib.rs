//! # NLP - Dependency Parses for Recursive Encoders
//!
//! This crate turns sentences into the dependency trees that recursive
//! encoders compose over.
//!
//! ## Core Concepts
//!
//! - **Tokens**: position, surface form, head pointer and relation label
//! - **Parsers**: any source of parses behind the [`DependencyParser`] trait
//! - **Treebanks**: parses read from CoNLL-U and served from memory
//! - **Vocabularies**: the lowercased word list an encoder keeps vectors for
//!
//! ## Example: Parsing "The cat sat."
//!
//! ```rust
//! use recursive_nlp::{DependencyParser, Treebank, Vocabulary};
//!
//! let treebank = Treebank::from_conllu(
//!     "1\tThe\tthe\tDET\t_\t_\t2\tdet\t_\t_\n\
//!      2\tcat\tcat\tNOUN\t_\t_\t3\tnsubj\t_\t_\n\
//!      3\tsat\tsit\tVERB\t_\t_\t0\troot\t_\t_\n\
//!      4\t.\t.\tPUNCT\t_\t_\t3\tpunct\t_\t_\n",
//! )
//! .unwrap();
//!
//! let parse = treebank.parse("The cat sat.").unwrap();
//! assert_eq!(parse[2].dep, "ROOT");
//! assert_eq!(parse[2].children, vec![1, 3]);
//!
//! let vocab = Vocabulary::from_treebank(&treebank);
//! assert!(vocab.contains("the"));
//! ```

pub mod conllu;
mod error;
pub mod labels;
pub mod parser;
pub mod token;
pub mod vocab;

pub use conllu::{parse_conllu, ParsedSentence, Treebank};
pub use error::NlpError;
pub use labels::{is_known_label, DEPENDENCY_LABELS, ROOT_LABEL};
pub use parser::{DependencyParser, Tokenizer, WhitespaceTokenizer};
pub use token::Token;
pub use vocab::Vocabulary;
