use std::io;
use thiserror::Error;

/// Custom error types for grammar construction, conversion and generation
#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed grammar at `{production}`: {reason}")]
    MalformedGrammar { production: String, reason: String },

    #[error("No production for non-terminal: {0}")]
    UndefinedProduction(String),

    #[error("Recursion limit of {0} exceeded during generation")]
    RecursionLimit(usize),

    #[error("Internal invariant violated after {stage}: {message}")]
    InvariantViolation { stage: String, message: String },
}

impl GrammarError {
    /// Shorthand for a construction-time error about one production
    pub fn malformed(production: impl Into<String>, reason: impl Into<String>) -> Self {
        GrammarError::MalformedGrammar {
            production: production.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is caused by the caller's input rather than a defect
    pub fn is_user_error(&self) -> bool {
        !matches!(self, GrammarError::InvariantViolation { .. })
    }
}

/// Result type for grammar operations
pub type Result<T> = std::result::Result<T, GrammarError>;

/// Trait extension for Option<T> to convert to GrammarError
pub trait OptionExt<T> {
    fn ok_or_grammar_err<F>(self, production: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_grammar_err<F>(self, production: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.ok_or_else(|| GrammarError::malformed(production, f()))
    }
}
