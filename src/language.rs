//! Bounded enumeration of the language a grammar generates.
//!
//! Used to compare grammars before and after a transformation: two grammars
//! that generate the same strings up to some length agree on every string
//! that length covers.

use indexmap::IndexMap;
use std::collections::BTreeSet;

use crate::grammar::{Grammar, Symbol};

/// A terminal string, one entry per terminal symbol
pub type Sentence = Vec<String>;

/// All terminal strings of at most `max_len` terminals derivable from the
/// start symbol.
///
/// Computed as a fixpoint over per-non-terminal string sets. Every set only
/// grows and is bounded by the strings of length `max_len` over the terminal
/// alphabet, so the computation terminates even for grammars with epsilon or
/// unit cycles.
pub fn bounded_language(grammar: &Grammar, max_len: usize) -> BTreeSet<Sentence> {
    let mut language: IndexMap<&str, BTreeSet<Vec<&str>>> = grammar
        .nonterminals()
        .iter()
        .map(|nt| (nt.as_str(), BTreeSet::new()))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for (nt, productions) in grammar.productions() {
            let mut derived = Vec::new();
            for production in productions {
                let mut partial: BTreeSet<Vec<&str>> = BTreeSet::from([Vec::new()]);
                for symbol in &production.symbols {
                    let options: Vec<Vec<&str>> = match symbol {
                        Symbol::Terminal(t) => vec![vec![t.as_str()]],
                        Symbol::Nonterminal(n) => language
                            .get(n.as_str())
                            .map(|set| set.iter().cloned().collect())
                            .unwrap_or_default(),
                    };
                    partial = concatenate(&partial, &options, max_len);
                    if partial.is_empty() {
                        break;
                    }
                }
                derived.extend(partial);
            }

            if let Some(own) = language.get_mut(nt.as_str()) {
                for sentence in derived {
                    changed |= own.insert(sentence);
                }
            }
        }
    }

    language
        .get(grammar.start_symbol())
        .map(|set| {
            set.iter()
                .map(|s| s.iter().map(|t| t.to_string()).collect())
                .collect()
        })
        .unwrap_or_default()
}

fn concatenate<'g>(
    prefixes: &BTreeSet<Vec<&'g str>>,
    suffixes: &[Vec<&'g str>],
    max_len: usize,
) -> BTreeSet<Vec<&'g str>> {
    let mut result = BTreeSet::new();
    for prefix in prefixes {
        for suffix in suffixes {
            if prefix.len() + suffix.len() <= max_len {
                let mut sentence = prefix.clone();
                sentence.extend_from_slice(suffix);
                result.insert(sentence);
            }
        }
    }
    result
}

/// Whether two grammars generate the same strings of at most `max_len` terminals
pub fn equivalent_up_to(a: &Grammar, b: &Grammar, max_len: usize) -> bool {
    bounded_language(a, max_len) == bounded_language(b, max_len)
}
