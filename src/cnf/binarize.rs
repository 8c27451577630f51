//! Binarization: rewriting every body into `A → a` or `A → B C`.

use indexmap::{IndexMap, IndexSet};
use log::trace;

use crate::grammar::{Grammar, Production, Symbol};

/// Rewrites the productions of one grammar into strict CNF shapes.
///
/// A `Binarizer` owns the counter behind the fresh `N0, N1, ...` names and the
/// terminal-to-`T_t` table. Both are reset at the start of every run, so
/// separate conversions never share naming state.
///
/// `T_t → t` is created only for terminals that occur in a body of length two
/// or more; a terminal used only as `A → t` gets no `T_t`.
#[derive(Debug, Default)]
pub struct Binarizer {
    counter: usize,
    terminal_nonterminals: IndexMap<String, String>,
    introduced: IndexSet<String>,
    pending: Vec<(String, Production)>,
}

impl Binarizer {
    pub fn new() -> Self {
        Binarizer::default()
    }

    /// Non-terminals created by the last run, in creation order
    pub fn introduced(&self) -> &IndexSet<String> {
        &self.introduced
    }

    /// Rewrite every production of `grammar`.
    ///
    /// Bodies of length two or more get their terminals replaced by dedicated
    /// `T_t → t` non-terminals; bodies longer than two become a left-nested
    /// chain `N0 → X1 X2`, `N1 → N0 X3`, ..., `A → Nk Xn`. Bodies of length
    /// zero or one pass through unchanged.
    pub fn run(&mut self, mut grammar: Grammar) -> Grammar {
        self.counter = 0;
        self.terminal_nonterminals.clear();
        self.introduced.clear();
        self.pending.clear();

        let original = std::mem::take(&mut grammar.productions);
        let mut rebuilt: IndexMap<String, Vec<Production>> = IndexMap::new();

        for (nt, productions) in original {
            let mut list: IndexSet<Production> = IndexSet::new();
            for production in productions {
                let rewritten = if production.len() <= 1 {
                    production
                } else {
                    self.split(&mut grammar, production)
                };
                list.insert(rewritten);
            }
            rebuilt.insert(nt, list.into_iter().collect());
        }

        for (nt, production) in self.pending.drain(..) {
            rebuilt.entry(nt).or_default().push(production);
        }

        trace!("binarization introduced {:?}", self.introduced);
        grammar.productions = rebuilt;
        grammar
    }

    fn split(&mut self, grammar: &mut Grammar, production: Production) -> Production {
        let mut symbols: Vec<Symbol> = production
            .symbols
            .into_iter()
            .map(|s| self.isolate(grammar, s))
            .collect();

        let last = symbols.pop();
        let mut rest = symbols.into_iter();
        let mut left = rest.next();

        for next in rest {
            let name = self.next_chain_name(grammar);
            let body = left.into_iter().chain([next]).collect();
            self.introduce(grammar, name.clone(), Production::new(body));
            left = Some(Symbol::Nonterminal(name));
        }

        Production::new(left.into_iter().chain(last).collect())
    }

    /// Replace a terminal by its dedicated non-terminal, creating it on first use
    fn isolate(&mut self, grammar: &mut Grammar, symbol: Symbol) -> Symbol {
        let terminal = match symbol {
            Symbol::Terminal(t) => t,
            nonterminal => return nonterminal,
        };

        if let Some(name) = self.terminal_nonterminals.get(&terminal) {
            return Symbol::Nonterminal(name.clone());
        }

        let name = grammar.fresh_name(&format!("T_{}", terminal));
        self.terminal_nonterminals
            .insert(terminal.clone(), name.clone());
        self.introduce(
            grammar,
            name.clone(),
            Production::new(vec![Symbol::Terminal(terminal)]),
        );
        Symbol::Nonterminal(name)
    }

    fn next_chain_name(&mut self, grammar: &Grammar) -> String {
        loop {
            let name = format!("N{}", self.counter);
            self.counter += 1;
            if !grammar.nonterminals.contains(&name) && !grammar.terminals.contains(&name) {
                return name;
            }
        }
    }

    fn introduce(&mut self, grammar: &mut Grammar, name: String, production: Production) {
        grammar.nonterminals.insert(name.clone());
        self.introduced.insert(name.clone());
        self.pending.push((name, production));
    }
}

/// Binarize a grammar with a fresh, run-local [`Binarizer`]
pub fn binarize(grammar: Grammar) -> Grammar {
    Binarizer::new().run(grammar)
}
