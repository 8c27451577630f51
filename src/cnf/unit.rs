//! Unit-production elimination.

use indexmap::{IndexMap, IndexSet};
use log::trace;

use crate::grammar::{Grammar, Production};

/// For every non-terminal, the non-terminals reachable through zero or more
/// unit productions, itself first.
pub fn unit_closure(grammar: &Grammar) -> IndexMap<String, IndexSet<String>> {
    let mut closure: IndexMap<String, IndexSet<String>> = grammar
        .nonterminals
        .iter()
        .map(|nt| (nt.clone(), IndexSet::from([nt.clone()])))
        .collect();

    let mut changed = true;
    while changed {
        changed = false;
        for (nt, productions) in &grammar.productions {
            for target in productions.iter().filter_map(Production::unit_target) {
                let reachable: Vec<String> = closure
                    .get(target)
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default();
                if let Some(own) = closure.get_mut(nt) {
                    for name in reachable {
                        changed |= own.insert(name);
                    }
                }
            }
        }
    }

    trace!("unit closure: {:?}", closure);
    closure
}

/// Remove every production `A → B` by inlining the non-unit productions of
/// everything `A` reaches through unit productions.
///
/// Closures are computed in full before any list is rewritten, and every new
/// list is built from the original lists.
pub fn eliminate_unit_productions(mut grammar: Grammar) -> Grammar {
    let closure = unit_closure(&grammar);
    let is_proper = |p: &&Production| p.unit_target().is_none();

    let mut rebuilt: IndexMap<String, Vec<Production>> = IndexMap::new();
    for (nt, productions) in &grammar.productions {
        let mut list: IndexSet<Production> = productions.iter().filter(is_proper).cloned().collect();
        if let Some(reachable) = closure.get(nt) {
            for other in reachable.iter().filter(|other| *other != nt) {
                list.extend(grammar.productions_of(other).iter().filter(is_proper).cloned());
            }
        }
        rebuilt.insert(nt.clone(), list.into_iter().collect());
    }

    grammar.productions = rebuilt;
    grammar
}
