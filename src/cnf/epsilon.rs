//! Epsilon-production elimination.

use indexmap::IndexSet;
use log::{trace, warn};

use crate::grammar::{Grammar, Production, Symbol};

/// Nullable positions in one body above which a warning is logged
pub const DEFAULT_NULLABLE_WARNING_THRESHOLD: usize = 12;

/// Compute the non-terminals that derive the empty string.
///
/// A non-terminal is nullable if one of its bodies consists only of nullable
/// non-terminals; the empty body qualifies trivially. The set only grows, so
/// the loop runs at most once per non-terminal plus one final pass.
pub fn nullable_set(grammar: &Grammar) -> IndexSet<String> {
    let mut nullable: IndexSet<String> = IndexSet::new();
    let mut round = 0;

    loop {
        round += 1;
        let mut changed = false;
        for (nt, productions) in &grammar.productions {
            if nullable.contains(nt) {
                continue;
            }
            let derives_empty = productions
                .iter()
                .any(|p| p.symbols.iter().all(|s| is_nullable(s, &nullable)));
            if derives_empty {
                nullable.insert(nt.clone());
                changed = true;
            }
        }
        trace!("nullable round {}: {:?}", round, nullable);
        if !changed {
            return nullable;
        }
    }
}

fn is_nullable(symbol: &Symbol, nullable: &IndexSet<String>) -> bool {
    matches!(symbol, Symbol::Nonterminal(n) if nullable.contains(n))
}

/// Every non-empty body obtained by dropping a subset of the nullable positions.
///
/// The original body comes first. The number of variants doubles with every
/// nullable position.
pub fn nullable_variants(production: &Production, nullable: &IndexSet<String>) -> Vec<Production> {
    let mut variants: Vec<Vec<Symbol>> = vec![Vec::new()];

    for symbol in &production.symbols {
        if is_nullable(symbol, nullable) {
            variants = variants
                .into_iter()
                .flat_map(|without| {
                    let mut with = without.clone();
                    with.push(symbol.clone());
                    [with, without]
                })
                .collect();
        } else {
            for variant in &mut variants {
                variant.push(symbol.clone());
            }
        }
    }

    variants
        .into_iter()
        .filter(|v| !v.is_empty())
        .map(Production::new)
        .collect()
}

/// Remove every empty production without changing the language.
pub fn eliminate_epsilon(grammar: Grammar) -> Grammar {
    eliminate_epsilon_with_threshold(grammar, DEFAULT_NULLABLE_WARNING_THRESHOLD)
}

/// Remove every empty production, warning about bodies with more than
/// `warn_threshold` nullable positions.
///
/// If the start symbol is nullable a fresh start `S'` with `S' → S | ε` is
/// introduced, so the empty string stays derivable.
pub fn eliminate_epsilon_with_threshold(mut grammar: Grammar, warn_threshold: usize) -> Grammar {
    let nullable = nullable_set(&grammar);

    for (nt, productions) in grammar.productions.iter_mut() {
        let mut rebuilt: IndexSet<Production> = IndexSet::new();
        for production in productions.iter().filter(|p| !p.is_epsilon()) {
            let positions = production
                .symbols
                .iter()
                .filter(|s| is_nullable(s, &nullable))
                .count();
            if positions > warn_threshold {
                warn!(
                    "`{} → {}` has {} nullable positions, expanding to up to 2^{} bodies",
                    nt, production, positions, positions
                );
            }
            rebuilt.extend(nullable_variants(production, &nullable));
        }
        *productions = rebuilt.into_iter().collect();
    }

    if nullable.contains(&grammar.start) {
        let old_start = grammar.start.clone();
        let new_start = grammar.fresh_name(&format!("{}'", old_start));
        grammar.insert_nonterminal(
            new_start.clone(),
            vec![
                Production::new(vec![Symbol::Nonterminal(old_start)]),
                Production::epsilon(),
            ],
        );
        grammar.start = new_start;
    }

    grammar
}
