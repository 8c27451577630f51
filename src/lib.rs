//! cnf-normalizer converts context-free grammars into Chomsky Normal Form.
//!
//! A grammar is built from `(non-terminal, right-hand side)` pairs, then run
//! through a pipeline of language-preserving stages: epsilon elimination, unit
//! elimination, removal of inaccessible and of non-productive symbols, and
//! binarization. Afterwards every production is either `A → a` or `A → B C`.
//!
//! # Example
//!
//! ```rust
//! use cnf_normalizer::{CnfConverter, Grammar};
//!
//! let grammar = Grammar::from_pairs(
//!     [
//!         ("S", vec!["a", "S", "b"]),
//!         ("S", vec!["ε"]),
//!     ],
//!     None,
//! )?;
//!
//! let cnf = CnfConverter::new().convert(grammar)?;
//! assert!(cnf.is_cnf());
//! println!("{}", cnf);
//! # Ok::<(), cnf_normalizer::GrammarError>(())
//! ```

pub mod cnf;
pub mod grammar;
pub mod language;
pub mod utils;

pub use cnf::{CnfConverter, Conversion, ConversionConfig, ConversionStep, Stage};
pub use grammar::{Grammar, GrammarBuilder, GrammarConfig, GrammarKind};
pub use utils::{GrammarError, Result};

// Re-export the building blocks of a grammar
pub use grammar::{EPSILON, Production, Symbol};
