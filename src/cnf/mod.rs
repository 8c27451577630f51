//! Conversion of context-free grammars into Chomsky Normal Form.
//!
//! The conversion is a linear pipeline of stages. Every stage takes a grammar
//! by value and returns the rewritten grammar, so the stages can also be used
//! and tested on their own:
//!
//! 1. [`epsilon::eliminate_epsilon`]
//! 2. [`unit::eliminate_unit_productions`]
//! 3. [`reachable::eliminate_inaccessible`]
//! 4. [`productive::eliminate_non_productive`]
//! 5. [`binarize::binarize`]

pub mod binarize;
pub mod epsilon;
pub mod productive;
pub mod reachable;
pub mod unit;

use log::{debug, info};
use serde::Serialize;
use std::fmt;

use crate::grammar::Grammar;
use crate::utils::{GrammarError, Result};

pub use binarize::{Binarizer, binarize};
pub use epsilon::{eliminate_epsilon, nullable_set};
pub use productive::{eliminate_non_productive, productive_nonterminals};
pub use reachable::{eliminate_inaccessible, reachable_symbols};
pub use unit::{eliminate_unit_productions, unit_closure};

/// One step of the conversion pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Original,
    EpsilonElimination,
    UnitElimination,
    InaccessibleElimination,
    NonProductiveElimination,
    Binarization,
}

impl Stage {
    /// Every stage that rewrites the grammar, in pipeline order
    pub const PIPELINE: [Stage; 5] = [
        Stage::EpsilonElimination,
        Stage::UnitElimination,
        Stage::InaccessibleElimination,
        Stage::NonProductiveElimination,
        Stage::Binarization,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = match self {
            Stage::Original => "Original Grammar",
            Stage::EpsilonElimination => "After eliminating ε-productions",
            Stage::UnitElimination => "After eliminating unit productions",
            Stage::InaccessibleElimination => "After eliminating inaccessible symbols",
            Stage::NonProductiveElimination => "After eliminating non-productive symbols",
            Stage::Binarization => "Final CNF Grammar",
        };
        f.write_str(title)
    }
}

/// Configuration options for the conversion
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionConfig {
    /// Run inaccessible-symbol elimination again after productivity pruning,
    /// removing symbols that only non-productive productions referenced
    pub reprune_after_productivity: bool,
    /// Nullable positions in a single body above which a warning is logged
    pub nullable_warning_threshold: usize,
    /// Validate the grammar invariants after every stage
    pub check_invariants: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        ConversionConfig {
            reprune_after_productivity: false,
            nullable_warning_threshold: epsilon::DEFAULT_NULLABLE_WARNING_THRESHOLD,
            check_invariants: true,
        }
    }
}

/// The grammar as it looked after one stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionStep {
    pub stage: Stage,
    pub grammar: Grammar,
}

/// Every intermediate grammar of a conversion, starting with the input
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversion {
    pub steps: Vec<ConversionStep>,
}

impl Conversion {
    /// The final CNF grammar
    pub fn result(&self) -> &Grammar {
        // a conversion always records at least the original grammar
        &self.steps[self.steps.len() - 1].grammar
    }

    pub fn into_result(mut self) -> Grammar {
        self.steps
            .pop()
            .map(|step| step.grammar)
            .expect("a conversion always records at least the original grammar")
    }

    /// The grammar recorded after the first occurrence of `stage`
    pub fn after(&self, stage: Stage) -> Option<&Grammar> {
        self.steps
            .iter()
            .find(|step| step.stage == stage)
            .map(|step| &step.grammar)
    }
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "=== {} ===", step.stage)?;
            write!(f, "{}", step.grammar)?;
        }
        Ok(())
    }
}

/// Converts grammars into Chomsky Normal Form.
///
/// The converter only holds configuration; all naming state lives in the
/// [`Binarizer`] created by each call, so one converter can be shared freely.
#[derive(Debug, Clone, Default)]
pub struct CnfConverter {
    config: ConversionConfig,
}

impl CnfConverter {
    pub fn new() -> Self {
        CnfConverter::default()
    }

    pub fn with_config(config: ConversionConfig) -> Self {
        CnfConverter { config }
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// The stages this converter runs, in order
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages = Stage::PIPELINE.to_vec();
        if self.config.reprune_after_productivity {
            stages.insert(4, Stage::InaccessibleElimination);
        }
        stages
    }

    /// Convert a grammar into Chomsky Normal Form
    pub fn convert(&self, grammar: Grammar) -> Result<Grammar> {
        self.run(grammar, |_, _| {})
    }

    /// Convert a grammar, keeping a copy of the grammar after every stage
    pub fn convert_with_trace(&self, grammar: Grammar) -> Result<Conversion> {
        let mut steps = vec![ConversionStep {
            stage: Stage::Original,
            grammar: grammar.clone(),
        }];
        self.run(grammar, |stage, grammar| {
            steps.push(ConversionStep {
                stage,
                grammar: grammar.clone(),
            })
        })?;
        Ok(Conversion { steps })
    }

    fn run<F>(&self, mut grammar: Grammar, mut observe: F) -> Result<Grammar>
    where
        F: FnMut(Stage, &Grammar),
    {
        debug!("=== {} ===\n{}", Stage::Original, grammar);
        self.check(Stage::Original, &grammar)?;
        let productions_before = grammar.production_count();

        for stage in self.stages() {
            grammar = self.apply(stage, grammar);
            debug!("=== {} ===\n{}", stage, grammar);
            self.check(stage, &grammar)?;
            observe(stage, &grammar);
        }

        if let Some(violation) = grammar.cnf_violation() {
            return Err(invariant(
                Stage::Binarization,
                format!("`{}` is not in Chomsky Normal Form", violation),
            ));
        }

        info!(
            "converted grammar to CNF: {} productions -> {} productions, {} non-terminals",
            productions_before,
            grammar.production_count(),
            grammar.nonterminals().len()
        );
        Ok(grammar)
    }

    fn apply(&self, stage: Stage, grammar: Grammar) -> Grammar {
        match stage {
            Stage::Original => grammar,
            Stage::EpsilonElimination => epsilon::eliminate_epsilon_with_threshold(
                grammar,
                self.config.nullable_warning_threshold,
            ),
            Stage::UnitElimination => eliminate_unit_productions(grammar),
            Stage::InaccessibleElimination => eliminate_inaccessible(grammar),
            Stage::NonProductiveElimination => eliminate_non_productive(grammar),
            Stage::Binarization => Binarizer::new().run(grammar),
        }
    }

    /// Structural invariants plus the postconditions of the stages run so far
    fn check(&self, stage: Stage, grammar: &Grammar) -> Result<()> {
        if !self.config.check_invariants {
            return Ok(());
        }
        grammar.validate().map_err(|message| invariant(stage, message))?;

        if stage == Stage::Original {
            return Ok(());
        }
        for (lhs, production) in grammar.iter_productions() {
            if production.is_epsilon()
                && (lhs != grammar.start_symbol() || grammar.is_referenced(lhs))
            {
                return Err(invariant(
                    stage,
                    format!("empty production `{} → {}` survived", lhs, production),
                ));
            }
            if stage != Stage::EpsilonElimination && production.unit_target().is_some() {
                return Err(invariant(
                    stage,
                    format!("unit production `{} → {}` survived", lhs, production),
                ));
            }
        }
        Ok(())
    }
}

fn invariant(stage: Stage, message: String) -> GrammarError {
    GrammarError::InvariantViolation {
        stage: stage.to_string(),
        message,
    }
}
