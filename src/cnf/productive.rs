//! Non-productive-symbol elimination.

use indexmap::IndexSet;
use log::{trace, warn};

use crate::grammar::{Grammar, Symbol};

/// Compute the non-terminals that derive at least one terminal string.
///
/// Terminals are productive; a non-terminal becomes productive once one of its
/// bodies consists solely of productive symbols.
pub fn productive_nonterminals(grammar: &Grammar) -> IndexSet<String> {
    let mut productive: IndexSet<String> = IndexSet::new();

    let mut changed = true;
    while changed {
        changed = false;
        for (nt, productions) in &grammar.productions {
            if productive.contains(nt) {
                continue;
            }
            if productions
                .iter()
                .any(|p| p.symbols.iter().all(|s| is_productive(s, &productive)))
            {
                productive.insert(nt.clone());
                changed = true;
            }
        }
    }

    trace!("productive: {:?}", productive);
    productive
}

fn is_productive(symbol: &Symbol, productive: &IndexSet<String>) -> bool {
    match symbol {
        Symbol::Terminal(_) => true,
        Symbol::Nonterminal(n) => productive.contains(n),
    }
}

/// Delete every non-terminal that cannot derive a terminal string, together
/// with every production that mentions one.
///
/// The start symbol always survives; when it is not productive it is left
/// without productions and the grammar generates the empty language.
pub fn eliminate_non_productive(mut grammar: Grammar) -> Grammar {
    let productive = productive_nonterminals(&grammar);
    let start = grammar.start.clone();
    let keep = |nt: &String| productive.contains(nt) || *nt == start;

    if !productive.contains(&start) {
        warn!("start symbol `{}` derives no terminal string", start);
    }

    grammar.nonterminals.retain(|nt| keep(nt));
    grammar.productions.retain(|nt, _| keep(nt));
    for productions in grammar.productions.values_mut() {
        productions.retain(|p| p.symbols.iter().all(|s| is_productive(s, &productive)));
    }

    grammar
}
