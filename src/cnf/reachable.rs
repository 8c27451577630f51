//! Inaccessible-symbol elimination.

use indexmap::IndexSet;

use crate::grammar::{Grammar, Symbol};

/// Symbols visited by a traversal from the start symbol, in discovery order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reachable {
    pub nonterminals: IndexSet<String>,
    pub terminals: IndexSet<String>,
}

/// Walk the production graph from the start symbol.
///
/// Every symbol of every body of a visited non-terminal is visited in turn;
/// terminals are leaves. The visited sets make the walk safe on cycles.
pub fn reachable_symbols(grammar: &Grammar) -> Reachable {
    let mut reachable = Reachable::default();
    let mut stack = vec![grammar.start.as_str()];
    reachable.nonterminals.insert(grammar.start.clone());

    while let Some(nt) = stack.pop() {
        for symbol in grammar.productions_of(nt).iter().flat_map(|p| &p.symbols) {
            match symbol {
                Symbol::Terminal(t) => {
                    reachable.terminals.insert(t.clone());
                }
                Symbol::Nonterminal(n) => {
                    if reachable.nonterminals.insert(n.clone()) {
                        stack.push(n);
                    }
                }
            }
        }
    }

    reachable
}

/// Delete every non-terminal and terminal that no derivation from the start
/// symbol can produce.
pub fn eliminate_inaccessible(mut grammar: Grammar) -> Grammar {
    let reachable = reachable_symbols(&grammar);

    grammar
        .nonterminals
        .retain(|nt| reachable.nonterminals.contains(nt));
    grammar
        .productions
        .retain(|nt, _| reachable.nonterminals.contains(nt));
    grammar.terminals.retain(|t| reachable.terminals.contains(t));

    grammar
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unreachable_symbols_are_removed() {
        let grammar = Grammar::from_pairs(
            [
                ("S", vec!["a", "A"]),
                ("A", vec!["S"]),
                ("A", vec!["b"]),
                ("E", vec!["e", "A"]),
                ("F", vec!["F", "f"]),
            ],
            None,
        )
        .unwrap();
        let result = eliminate_inaccessible(grammar);

        assert_eq!(result.nonterminals().iter().collect::<Vec<_>>(), ["S", "A"]);
        assert_eq!(result.terminals().iter().collect::<Vec<_>>(), ["a", "b"]);
        assert!(!result.productions().contains_key("E"));
        assert!(!result.productions().contains_key("F"));
        assert!(result.validate().is_ok());
    }

    #[test]
    fn test_cycles_terminate() {
        let grammar = Grammar::from_pairs(
            [("S", vec!["A"]), ("A", vec!["B"]), ("B", vec!["S", "x"])],
            None,
        )
        .unwrap();
        let reachable = reachable_symbols(&grammar);
        assert_eq!(reachable.nonterminals.len(), 3);
        assert_eq!(reachable.terminals.iter().collect::<Vec<_>>(), ["x"]);
    }

    #[test]
    fn test_start_without_productions_survives() {
        let mut grammar =
            Grammar::from_pairs([("S", vec!["a"]), ("T", vec!["t"])], None).unwrap();
        grammar.productions.get_mut("S").unwrap().clear();
        let result = eliminate_inaccessible(grammar);

        assert_eq!(result.nonterminals().iter().collect::<Vec<_>>(), ["S"]);
        assert!(result.terminals().is_empty());
        assert!(result.validate().is_ok());
    }
}
