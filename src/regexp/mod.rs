//! Pattern parsing and automaton construction.
//!
//! The dialect is a small regex subset aimed at pinyin input:
//! - literal characters, matched against one character of a spelling
//! - `.` any one spelling character
//! - `[...]` and `[^...]` character classes with ranges
//! - `\d \w \s` and their negations, tested against the token's character
//! - `\z` one whole token
//! - `|` alternation and `(...)` grouping
//! - `?`, `*`, `+`, `{m}`, `{m,}`, `{m,n}` quantifiers (bounds up to 1000)
//! - `^` and `$` at the edges of a top-level branch
//!
//! Groups and quantifiers may nest at most [`NEST_LIMIT`] deep.
//!
//! The escape character is `\`.

mod nfa;
mod parser;

pub use nfa::{compile_ast, compile_ast_with_limit, Nfa, MAX_STATES, MAX_TREE_DEPTH};
pub use parser::{
    parse_pattern, simplify_rune_range, CharClass, Escape, EscapeKind, Node, RunePair, RuneRange,
    NEST_LIMIT, REPEAT_MAX,
};
