//! Error types.
//!
//! Every fallible entry point returns [`PinyinRegexError`], a closed enum over
//! the three failure kinds. Callers match on the variant; the leaf structs
//! carry the details.

use thiserror::Error;

/// Malformed pattern text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at offset {offset}")]
pub struct PatternSyntaxError {
    pub message: String,
    /// Byte offset into the pattern where the problem was detected.
    pub offset: usize,
}

impl PatternSyntaxError {
    pub(crate) fn new(message: impl Into<String>, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

/// An AST that cannot be turned into an automaton.
///
/// The parser never produces such trees, but `compile_ast` accepts
/// hand-built ones and rejects them here instead of building garbage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompilationError {
    #[error("repeat bounds out of order: min {min} > max {max}")]
    InvertedRepeat { min: u32, max: u32 },
    #[error("repeat bound {bound} exceeds limit {limit}")]
    RepeatTooLarge { bound: u32, limit: u32 },
    #[error("automaton exceeds {limit} states")]
    TooManyStates { limit: usize },
    #[error("anchor outside the start or end of a top-level branch")]
    MisplacedAnchor,
    #[error("tree nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Failure reported by a [`Tokenize`](crate::Tokenize) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TokenizationError {
    pub message: String,
}

impl TokenizationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors that can occur while compiling a pattern or matching text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PinyinRegexError {
    #[error("invalid pattern: {0}")]
    PatternSyntax(#[from] PatternSyntaxError),
    #[error("compilation failed: {0}")]
    Compilation(#[from] CompilationError),
    #[error("tokenization failed: {0}")]
    Tokenization(#[from] TokenizationError),
}
