use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::utils::{GrammarError, OptionExt, Result};

/// Sentinel right-hand side denoting the empty production
pub const EPSILON: &str = "ε";

/// Represents a symbol in the grammar, either a terminal or a non-terminal
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    /// A terminal symbol (part of the generated language)
    Terminal(String),
    /// A non-terminal symbol (rewritten by productions)
    Nonterminal(String),
}

impl Symbol {
    pub fn terminal(name: impl Into<String>) -> Self {
        Symbol::Terminal(name.into())
    }

    pub fn nonterminal(name: impl Into<String>) -> Self {
        Symbol::Nonterminal(name.into())
    }

    /// The identifier of this symbol, without its tag
    pub fn name(&self) -> &str {
        match self {
            Symbol::Terminal(name) | Symbol::Nonterminal(name) => name,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Symbol::Terminal(_))
    }

    pub fn is_nonterminal(&self) -> bool {
        matches!(self, Symbol::Nonterminal(_))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Represents the right-hand side of a production rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Production {
    /// The sequence of symbols; empty for the epsilon production
    pub symbols: Vec<Symbol>,
}

impl Production {
    pub fn new(symbols: Vec<Symbol>) -> Self {
        Production { symbols }
    }

    /// The empty production
    pub fn epsilon() -> Self {
        Production::default()
    }

    pub fn is_epsilon(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// The target of a unit production `A → B`, if this is one
    pub fn unit_target(&self) -> Option<&str> {
        match self.symbols.as_slice() {
            [Symbol::Nonterminal(name)] => Some(name),
            _ => None,
        }
    }

    /// Whether this production mentions the given non-terminal
    pub fn mentions(&self, nonterminal: &str) -> bool {
        self.symbols
            .iter()
            .any(|s| matches!(s, Symbol::Nonterminal(n) if n == nonterminal))
    }
}

impl fmt::Display for Production {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.symbols.is_empty() {
            f.write_str(EPSILON)
        } else {
            write!(f, "{}", self.symbols.iter().format(""))
        }
    }
}

/// Configuration options for random generation
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarConfig {
    /// Whether to put spaces between generated terminals
    pub auto_spacing: bool,
    /// Maximum recursion depth for expansion (to prevent infinite recursion)
    pub max_recursion_depth: usize,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig {
            auto_spacing: false,
            max_recursion_depth: 100,
        }
    }
}

/// Position of a grammar in the Chomsky hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GrammarKind {
    /// Right-linear: every body is `ε`, `a` or `a B`
    Regular,
    /// Any other grammar with a single non-terminal on every left-hand side
    ContextFree,
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarKind::Regular => f.write_str("Type 3 (Regular Grammar)"),
            GrammarKind::ContextFree => f.write_str("Type 2 (Context-Free Grammar)"),
        }
    }
}

/// A context-free grammar `G = (VN, VT, P, S)`.
///
/// Non-terminals, terminals and productions keep insertion order so that
/// rendering and every transformation stage are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grammar {
    pub(crate) nonterminals: IndexSet<String>,
    pub(crate) terminals: IndexSet<String>,
    pub(crate) productions: IndexMap<String, Vec<Production>>,
    pub(crate) start: String,
}

/// JSON input: ordered `(non-terminal, right-hand side)` pairs
#[derive(Debug, Deserialize)]
struct GrammarDocument {
    #[serde(default)]
    start: Option<String>,
    productions: Vec<(String, Vec<String>)>,
}

impl Grammar {
    /// Build a grammar from `(non-terminal, right-hand side)` pairs.
    ///
    /// Non-terminals are the left-hand sides, every other right-hand side symbol
    /// is a terminal, and `["ε"]` is the empty production. The start symbol
    /// defaults to the first left-hand side.
    pub fn from_pairs<I, L, R, T>(pairs: I, start: Option<&str>) -> Result<Self>
    where
        I: IntoIterator<Item = (L, R)>,
        L: Into<String>,
        R: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut builder = GrammarBuilder::new();
        if let Some(start) = start {
            builder = builder.start(start);
        }
        for (lhs, rhs) in pairs {
            builder = builder.add_pair(lhs, rhs.into_iter().map(Into::into).collect());
        }
        builder.build()
    }

    /// Parse a grammar from a rule file
    pub fn from_file<P: AsRef<Path>>(path: P, start: Option<&str>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_text(&text, start)
    }

    /// Parse a grammar written as `<A> ::= [a, <B>]` rules.
    ///
    /// A rule may continue over several lines until its closing bracket, and
    /// `| [...]` adds an alternative to the previous rule. `#` starts a comment
    /// line, or a trailing comment after the closing `]`; `[ε]` and `[]` both
    /// denote the empty production.
    pub fn from_text(text: &str, start: Option<&str>) -> Result<Self> {
        let rule_regex = Regex::new(r"^<([^>]+)>\s*::=\s*\[(.*)$").expect("valid rule regex");
        let alt_regex = Regex::new(r"^\|\s*\[(.*)$").expect("valid alternative regex");

        let mut builder = GrammarBuilder::new();
        if let Some(start) = start {
            builder = builder.start(start);
        }

        // (rule name, line the rule started on, body collected so far)
        let mut pending: Option<(String, usize, String)> = None;
        let mut current_rule: Option<String> = None;

        for (index, line) in text.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = strip_trailing_comment(line.trim());

            if let Some((name, started, mut body)) = pending.take() {
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    pending = Some((name, started, body));
                    continue;
                }
                body.push(' ');
                body.push_str(trimmed);
                if let Some(elements) = body.strip_suffix(']') {
                    let symbols = parse_elements(elements, started)?;
                    builder = builder.add_symbols(&name, symbols);
                    current_rule = Some(name);
                } else {
                    pending = Some((name, started, body));
                }
                continue;
            }

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (name, body) = if let Some(captures) = rule_regex.captures(trimmed) {
                (captures[1].trim().to_string(), captures[2].to_string())
            } else if let Some(captures) = alt_regex.captures(trimmed) {
                let name = current_rule.clone().ok_or_else(|| GrammarError::Parse {
                    line: line_no,
                    message: "alternative without a preceding rule".to_string(),
                })?;
                (name, captures[1].to_string())
            } else {
                return Err(GrammarError::Parse {
                    line: line_no,
                    message: format!("expected `<name> ::= [...]`, found `{}`", trimmed),
                });
            };

            match body.trim_end().strip_suffix(']') {
                Some(elements) => {
                    let symbols = parse_elements(elements, line_no)?;
                    builder = builder.add_symbols(&name, symbols);
                    current_rule = Some(name);
                }
                None => pending = Some((name, line_no, body)),
            }
        }

        if let Some((name, started, _)) = pending {
            return Err(GrammarError::Parse {
                line: started,
                message: format!("rule `{}` is missing its closing `]`", name),
            });
        }

        builder.build()
    }

    /// Parse a grammar from its JSON pair list; `start` overrides the file's
    pub fn from_json(json: &str, start: Option<&str>) -> Result<Self> {
        let document: GrammarDocument = serde_json::from_str(json)?;
        Self::from_pairs(document.productions, start.or(document.start.as_deref()))
    }

    /// Serialize this grammar as pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn nonterminals(&self) -> &IndexSet<String> {
        &self.nonterminals
    }

    pub fn terminals(&self) -> &IndexSet<String> {
        &self.terminals
    }

    pub fn productions(&self) -> &IndexMap<String, Vec<Production>> {
        &self.productions
    }

    /// Productions of one non-terminal; empty when it has none or is unknown
    pub fn productions_of(&self, nonterminal: &str) -> &[Production] {
        self.productions
            .get(nonterminal)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Get the start symbol
    pub fn start_symbol(&self) -> &str {
        &self.start
    }

    /// Check if the grammar contains a specific non-terminal
    pub fn has_non_terminal(&self, name: &str) -> bool {
        self.nonterminals.contains(name)
    }

    /// Every `(lhs, body)` pair in rendering order
    pub fn iter_productions(&self) -> impl Iterator<Item = (&str, &Production)> {
        self.productions
            .iter()
            .flat_map(|(lhs, prods)| prods.iter().map(move |p| (lhs.as_str(), p)))
    }

    pub fn production_count(&self) -> usize {
        self.productions.values().map(Vec::len).sum()
    }

    /// Whether any body mentions the given non-terminal
    pub fn is_referenced(&self, nonterminal: &str) -> bool {
        self.iter_productions().any(|(_, p)| p.mentions(nonterminal))
    }

    /// A name based on `base` that is neither a terminal nor a non-terminal
    pub(crate) fn fresh_name(&self, base: &str) -> String {
        let mut name = base.to_string();
        while self.nonterminals.contains(&name) || self.terminals.contains(&name) {
            name.push('\'');
        }
        name
    }

    /// Insert (or replace) a non-terminal together with its productions
    pub(crate) fn insert_nonterminal(&mut self, name: String, productions: Vec<Production>) {
        self.nonterminals.insert(name.clone());
        self.productions.insert(name, productions);
    }

    /// Check the structural invariants every grammar value must satisfy.
    ///
    /// Returns a description of the first violation found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.nonterminals.contains(&self.start) {
            return Err(format!("start symbol `{}` is not a non-terminal", self.start));
        }
        if let Some(both) = self.terminals.intersection(&self.nonterminals).next() {
            return Err(format!("`{}` is both a terminal and a non-terminal", both));
        }
        if let Some(nt) = self
            .nonterminals
            .iter()
            .find(|nt| !self.productions.contains_key(*nt))
        {
            return Err(format!("non-terminal `{}` has no production entry", nt));
        }
        if let Some(key) = self
            .productions
            .keys()
            .find(|key| !self.nonterminals.contains(*key))
        {
            return Err(format!("production key `{}` is not a non-terminal", key));
        }
        for (lhs, production) in self.iter_productions() {
            for symbol in &production.symbols {
                let declared = match symbol {
                    Symbol::Terminal(t) => self.terminals.contains(t),
                    Symbol::Nonterminal(n) => self.nonterminals.contains(n),
                };
                if !declared {
                    return Err(format!(
                        "`{} → {}` uses undeclared symbol `{}`",
                        lhs, production, symbol
                    ));
                }
            }
        }
        Ok(())
    }

    /// Describe the first production that is not in Chomsky Normal Form.
    ///
    /// Allowed shapes are `A → a`, `A → B C`, and `S → ε` when `S` is the start
    /// symbol and never occurs in a body.
    pub fn cnf_violation(&self) -> Option<String> {
        self.iter_productions().find_map(|(lhs, production)| {
            let conforms = match production.symbols.as_slice() {
                [] => lhs == self.start && !self.is_referenced(lhs),
                [Symbol::Terminal(_)] => true,
                [Symbol::Nonterminal(_), Symbol::Nonterminal(_)] => true,
                _ => false,
            };
            (!conforms).then(|| format!("{} → {}", lhs, production))
        })
    }

    /// Whether every production is in Chomsky Normal Form
    pub fn is_cnf(&self) -> bool {
        self.cnf_violation().is_none()
    }

    /// Classify the grammar in the Chomsky hierarchy
    pub fn classify(&self) -> GrammarKind {
        let right_linear = self.iter_productions().all(|(_, p)| {
            matches!(
                p.symbols.as_slice(),
                [] | [Symbol::Terminal(_)] | [Symbol::Terminal(_), Symbol::Nonterminal(_)]
            )
        });
        if right_linear {
            GrammarKind::Regular
        } else {
            GrammarKind::ContextFree
        }
    }

    /// Generate a random string from the start symbol
    pub fn generate(&self, config: &GrammarConfig) -> Result<String> {
        self.generate_with_rng(config, &mut rand::thread_rng())
    }

    /// Generate a random string using the given random source
    pub fn generate_with_rng<R: Rng + ?Sized>(
        &self,
        config: &GrammarConfig,
        rng: &mut R,
    ) -> Result<String> {
        let mut output = Vec::new();
        self.expand_non_terminal(&self.start, 0, config, rng, &mut output)?;

        if config.auto_spacing {
            Ok(output.join(" "))
        } else {
            Ok(output.concat())
        }
    }

    /// Recursively expand a non-terminal symbol into terminals
    fn expand_non_terminal<'g, R: Rng + ?Sized>(
        &'g self,
        symbol: &str,
        depth: usize,
        config: &GrammarConfig,
        rng: &mut R,
        output: &mut Vec<&'g str>,
    ) -> Result<()> {
        if depth >= config.max_recursion_depth {
            return Err(GrammarError::RecursionLimit(config.max_recursion_depth));
        }

        let production = self
            .productions_of(symbol)
            .choose(rng)
            .ok_or_else(|| GrammarError::UndefinedProduction(symbol.to_string()))?;

        for element in &production.symbols {
            match element {
                Symbol::Terminal(text) => output.push(text),
                Symbol::Nonterminal(name) => {
                    self.expand_non_terminal(name, depth + 1, config, rng, output)?
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "G = (VN, VT, P, S)")?;
        writeln!(f, "VN = {{{}}}", self.nonterminals.iter().join(", "))?;
        writeln!(f, "VT = {{{}}}", self.terminals.iter().join(", "))?;
        writeln!(f, "Start Symbol = {}", self.start)?;
        writeln!(f, "Productions:")?;
        for (i, (lhs, production)) in self.iter_productions().enumerate() {
            writeln!(f, "{}. {} → {}", i + 1, lhs, production)?;
        }
        Ok(())
    }
}

/// A right-hand side element before symbol classification
#[derive(Debug, Clone, PartialEq)]
enum RawSymbol {
    /// Non-terminal if it is a left-hand side, terminal otherwise
    Inferred(String),
    /// Written as `<name>`: must be a left-hand side
    Nonterminal(String),
    /// Written quoted: must not be a left-hand side
    Terminal(String),
}

impl RawSymbol {
    /// Interpret `<X>` and quoted markup; anything else is inferred
    fn parse(element: &str) -> Self {
        let quoted = |q: char| element.len() >= 2 && element.starts_with(q) && element.ends_with(q);
        if element.len() > 2 && element.starts_with('<') && element.ends_with('>') {
            RawSymbol::Nonterminal(element[1..element.len() - 1].to_string())
        } else if quoted('"') || quoted('\'') {
            RawSymbol::Terminal(element[1..element.len() - 1].to_string())
        } else {
            RawSymbol::Inferred(element.to_string())
        }
    }

    fn name(&self) -> &str {
        match self {
            RawSymbol::Inferred(n) | RawSymbol::Nonterminal(n) | RawSymbol::Terminal(n) => n,
        }
    }
}

impl fmt::Display for RawSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawSymbol::Inferred(n) => write!(f, "{}", n),
            RawSymbol::Nonterminal(n) => write!(f, "<{}>", n),
            RawSymbol::Terminal(n) => write!(f, "\"{}\"", n),
        }
    }
}

/// Scan the inside of a `[...]` rule body into raw symbols
/// Cut a `# comment` that follows a closing `]`, ignoring `]` and `#` in quotes
fn strip_trailing_comment(line: &str) -> &str {
    let mut quote = None;
    let mut closed = false;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, ']') => closed = true,
            (None, '#') if closed => return line[..i].trim_end(),
            _ => {}
        }
    }
    line
}

fn parse_elements(elements: &str, line: usize) -> Result<Vec<RawSymbol>> {
    let parse_error = |message: String| GrammarError::Parse { line, message };
    let chars: Vec<char> = elements.chars().collect();
    let mut symbols = Vec::new();
    let mut pos = 0;

    while pos < chars.len() {
        let c = chars[pos];
        if c.is_whitespace() || c == ',' {
            pos += 1;
            continue;
        }

        let start = pos;
        let token: String = match c {
            '<' => {
                let end = chars[pos..]
                    .iter()
                    .position(|&ch| ch == '>')
                    .ok_or_else(|| parse_error("unterminated `<` in rule body".to_string()))?;
                pos += end + 1;
                chars[start..pos].iter().collect()
            }
            '"' | '\'' => {
                let end = chars[pos + 1..]
                    .iter()
                    .position(|&ch| ch == c)
                    .ok_or_else(|| parse_error(format!("unterminated {} in rule body", c)))?;
                pos += end + 2;
                chars[start..pos].iter().collect()
            }
            _ => {
                while pos < chars.len() && chars[pos] != ',' && !chars[pos].is_whitespace() {
                    pos += 1;
                }
                chars[start..pos].iter().collect()
            }
        };
        symbols.push(RawSymbol::parse(&token));
    }

    Ok(symbols)
}

/// Builder for constructing Grammar instances
#[derive(Debug, Default, Clone)]
pub struct GrammarBuilder {
    start: Option<String>,
    rules: Vec<(String, Vec<RawSymbol>)>,
}

impl GrammarBuilder {
    /// Create a new grammar builder
    pub fn new() -> Self {
        GrammarBuilder::default()
    }

    /// Set the start symbol (defaults to the first rule's left-hand side)
    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    /// Add a rule; `<X>` marks a non-terminal, quotes mark a terminal
    pub fn add_rule(self, non_terminal: &str, elements: &[&str]) -> Self {
        let symbols = elements.iter().map(|e| RawSymbol::parse(e)).collect();
        self.add_symbols(non_terminal, symbols)
    }

    /// Add a rule whose symbol names are taken verbatim
    pub fn add_pair(self, non_terminal: impl Into<String>, elements: Vec<String>) -> Self {
        let symbols = elements.into_iter().map(RawSymbol::Inferred).collect();
        self.add_symbols(non_terminal, symbols)
    }

    fn add_symbols(mut self, non_terminal: impl Into<String>, symbols: Vec<RawSymbol>) -> Self {
        self.rules.push((non_terminal.into(), symbols));
        self
    }

    /// Classify every symbol and build the grammar
    pub fn build(self) -> Result<Grammar> {
        let first = self
            .rules
            .first()
            .map(|(lhs, _)| lhs.clone())
            .ok_or_grammar_err("<empty grammar>", || "no productions supplied".to_string())?;

        let mut nonterminals = IndexSet::new();
        for (lhs, rhs) in &self.rules {
            if lhs.is_empty() || lhs == EPSILON {
                return Err(GrammarError::malformed(
                    render_rule(lhs, rhs),
                    "left-hand side must be a non-empty name other than ε",
                ));
            }
            nonterminals.insert(lhs.clone());
        }

        let start = self.start.unwrap_or(first);
        if !nonterminals.contains(&start) {
            return Err(GrammarError::malformed(
                &start,
                "start symbol is not the left-hand side of any production",
            ));
        }

        let mut productions: IndexMap<String, Vec<Production>> = nonterminals
            .iter()
            .map(|nt| (nt.clone(), Vec::new()))
            .collect();
        let mut terminals = IndexSet::new();

        for (lhs, rhs) in &self.rules {
            let production = match rhs.as_slice() {
                [] => Production::epsilon(),
                [RawSymbol::Inferred(only)] if only == EPSILON => Production::epsilon(),
                _ => {
                    let mut symbols = Vec::with_capacity(rhs.len());
                    for raw in rhs {
                        symbols.push(resolve_symbol(raw, &nonterminals, lhs, rhs)?);
                    }
                    for symbol in &symbols {
                        if let Symbol::Terminal(t) = symbol {
                            terminals.insert(t.clone());
                        }
                    }
                    Production::new(symbols)
                }
            };

            let list = productions
                .get_mut(lhs)
                .ok_or_grammar_err(lhs, || "left-hand side vanished".to_string())?;
            if !list.contains(&production) {
                list.push(production);
            }
        }

        Ok(Grammar {
            nonterminals,
            terminals,
            productions,
            start,
        })
    }
}

fn resolve_symbol(
    raw: &RawSymbol,
    nonterminals: &IndexSet<String>,
    lhs: &str,
    rhs: &[RawSymbol],
) -> Result<Symbol> {
    let name = raw.name();
    let reason = if name.is_empty() {
        Some("empty symbol name".to_string())
    } else if name == EPSILON {
        Some("ε may only appear as the whole right-hand side".to_string())
    } else {
        match raw {
            RawSymbol::Nonterminal(n) if !nonterminals.contains(n) => Some(format!(
                "`{}` is neither a declared non-terminal nor inferable as a terminal",
                n
            )),
            RawSymbol::Terminal(t) if nonterminals.contains(t) => Some(format!(
                "`{}` is used as a terminal but also has productions",
                t
            )),
            _ => None,
        }
    };

    if let Some(reason) = reason {
        return Err(GrammarError::malformed(render_rule(lhs, rhs), reason));
    }

    Ok(match raw {
        RawSymbol::Nonterminal(n) => Symbol::Nonterminal(n.clone()),
        RawSymbol::Terminal(t) => Symbol::Terminal(t.clone()),
        RawSymbol::Inferred(n) if nonterminals.contains(n) => Symbol::Nonterminal(n.clone()),
        RawSymbol::Inferred(t) => Symbol::Terminal(t.clone()),
    })
}

fn render_rule(lhs: &str, rhs: &[RawSymbol]) -> String {
    format!("{} → {}", lhs, rhs.iter().join(" "))
}
