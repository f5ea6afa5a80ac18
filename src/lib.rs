//! pinyin-regex: regular expressions over the pronunciation of Chinese text.
//!
//! A pattern such as `yin(yue|le)` or `yy` is matched not against the
//! characters of a text but against their pinyin spellings. Text is first
//! split into [`Token`]s, each carrying every spelling the pattern may use
//! (full pinyin, initials, fuzzy initials, the character itself), and the
//! compiled automaton then advances one whole token at a time.
//!
//! ```
//! use pinyin_regex::{is_match, MatchOptions, PinyinTokenizer, ReadingTable};
//!
//! let table = ReadingTable::parse("U+97F3: yīn\nU+4E50: lè,yuè\n").unwrap();
//! let tokenizer = PinyinTokenizer::new(table);
//! let options = MatchOptions::default();
//!
//! assert!(is_match("yinyue", "音乐", &tokenizer, &options).unwrap());
//! assert!(is_match("yy", "音乐", &tokenizer, &options).unwrap());
//! assert!(!is_match("^yin$", "音乐", &tokenizer, &options).unwrap());
//! ```
//!
//! Compile once and reuse the handle when matching many texts:
//!
//! ```
//! use pinyin_regex::{compile, Token};
//!
//! let regex = compile("zh?ong").unwrap();
//! let tokens = vec![Token::new("中", '中', ["zhong", "zh"])];
//! assert!(regex.exec(&tokens));
//! ```

pub mod automaton;
pub mod regexp;

mod cache;
mod error;
mod pinyin;
mod token;

use std::sync::{Arc, OnceLock};

pub use automaton::{
    Anchoring, CandidateMode, FrontierMatcher, Match, MatchEvent, MatchObserver, StepCounter,
};
pub use cache::{PatternCache, DEFAULT_CACHE_CAPACITY};
pub use error::{CompilationError, PatternSyntaxError, PinyinRegexError, TokenizationError};
pub use pinyin::{
    expand_pinyin, shengmu, strip_tones, PinyinTokenizer, ReadingTable, FUZZY_MAP, INITIALS,
    MAX_JOINED_SPELLINGS,
};
pub use regexp::Nfa;
pub use token::{LiteralTokenizer, Token, Tokenize, TokenizeOptions};

/// Options for the text-level entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchOptions {
    pub use_initials: bool,
    pub use_fuzzy: bool,
    pub split_chars: bool,
    pub mode: CandidateMode,
    /// Anchoring required on top of the pattern's own `^`/`$`.
    pub anchoring: Anchoring,
    /// Lowercase the pattern before compiling it.
    pub fold_case: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            use_initials: true,
            use_fuzzy: true,
            split_chars: true,
            mode: CandidateMode::Spellings,
            anchoring: Anchoring::None,
            fold_case: true,
        }
    }
}

impl MatchOptions {
    pub fn with_initials(mut self, on: bool) -> Self {
        self.use_initials = on;
        self
    }

    pub fn with_fuzzy(mut self, on: bool) -> Self {
        self.use_fuzzy = on;
        self
    }

    pub fn with_split_chars(mut self, on: bool) -> Self {
        self.split_chars = on;
        self
    }

    pub fn with_mode(mut self, mode: CandidateMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_anchoring(mut self, anchoring: Anchoring) -> Self {
        self.anchoring = anchoring;
        self
    }

    pub fn with_fold_case(mut self, on: bool) -> Self {
        self.fold_case = on;
        self
    }

    /// The subset of options a tokenizer needs.
    pub fn tokenize_options(&self) -> TokenizeOptions {
        TokenizeOptions {
            use_initials: self.use_initials,
            use_fuzzy: self.use_fuzzy,
            split_chars: self.split_chars,
        }
    }
}

/// A compiled pattern.
///
/// Immutable and `Send + Sync`; one handle can serve any number of
/// concurrent matches.
#[derive(Debug, Clone)]
pub struct PinyinRegex {
    pattern: String,
    nfa: Nfa,
}

impl PinyinRegex {
    pub fn new(pattern: &str) -> Result<Self, PinyinRegexError> {
        let ast = regexp::parse_pattern(pattern)?;
        let nfa = regexp::compile_ast(&ast)?;
        tracing::debug!(pattern, states = nfa.len(), "compiled pattern");
        Ok(Self {
            pattern: pattern.to_string(),
            nfa,
        })
    }

    /// The pattern text this handle was compiled from.
    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn nfa(&self) -> &Nfa {
        &self.nfa
    }

    /// Anchoring implied by the pattern's own `^` and `$`.
    pub fn anchoring(&self) -> Anchoring {
        self.nfa.anchoring()
    }

    /// A matcher with default mode and the pattern's anchoring.
    pub fn matcher(&self) -> FrontierMatcher<'_> {
        FrontierMatcher::new(&self.nfa)
    }

    fn configured(&self, options: &MatchOptions) -> FrontierMatcher<'_> {
        self.matcher()
            .with_mode(options.mode)
            .with_anchoring(options.anchoring)
    }

    /// True if some span of `tokens` is accepted.
    pub fn exec(&self, tokens: &[Token]) -> bool {
        self.matcher().is_match(tokens)
    }

    /// Like [`exec`](Self::exec), honouring mode and anchoring from `options`.
    pub fn exec_with(&self, tokens: &[Token], options: &MatchOptions) -> bool {
        self.configured(options).is_match(tokens)
    }

    pub fn exec_observed(&self, tokens: &[Token], observer: &mut dyn MatchObserver) -> bool {
        self.matcher().is_match_observed(tokens, observer)
    }

    /// Leftmost match, extended to the longest end at that start.
    pub fn find(&self, tokens: &[Token]) -> Option<Match> {
        self.matcher().find(tokens)
    }

    pub fn find_with(&self, tokens: &[Token], options: &MatchOptions) -> Option<Match> {
        self.configured(options).find(tokens)
    }

    /// Tokenize `text` and match it.
    pub fn is_match_text<T: Tokenize + ?Sized>(
        &self,
        text: &str,
        tokenizer: &T,
        options: &MatchOptions,
    ) -> Result<bool, PinyinRegexError> {
        let tokens = tokenizer.tokenize(text, &options.tokenize_options())?;
        Ok(self.exec_with(&tokens, options))
    }

    /// Tokenize `text` and find the leftmost match.
    pub fn find_text<T: Tokenize + ?Sized>(
        &self,
        text: &str,
        tokenizer: &T,
        options: &MatchOptions,
    ) -> Result<Option<Match>, PinyinRegexError> {
        let tokens = tokenizer.tokenize(text, &options.tokenize_options())?;
        Ok(self.find_with(&tokens, options))
    }
}

/// Compile a pattern for reuse.
pub fn compile(pattern: &str) -> Result<PinyinRegex, PinyinRegexError> {
    PinyinRegex::new(pattern)
}

/// Match a compiled pattern against tokens.
pub fn exec(regex: &PinyinRegex, tokens: &[Token]) -> bool {
    regex.exec(tokens)
}

fn shared_cache() -> &'static PatternCache {
    static CACHE: OnceLock<PatternCache> = OnceLock::new();
    CACHE.get_or_init(PatternCache::new)
}

/// Lowercase a pattern, leaving escaped characters alone so `\W` and
/// friends keep their meaning.
fn fold_pattern_case(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut escaped = false;
    for c in pattern.chars() {
        if escaped {
            out.push(c);
            escaped = false;
        } else {
            escaped = c == '\\';
            out.extend(c.to_lowercase());
        }
    }
    out
}

fn one_shot(pattern: &str, options: &MatchOptions) -> Result<Arc<PinyinRegex>, PinyinRegexError> {
    if options.fold_case {
        shared_cache().get_or_compile(&fold_pattern_case(pattern))
    } else {
        shared_cache().get_or_compile(pattern)
    }
}

/// Compile `pattern`, tokenize `text` and report whether they match.
///
/// Compiled patterns are kept in a process-wide [`PatternCache`].
pub fn is_match<T: Tokenize + ?Sized>(
    pattern: &str,
    text: &str,
    tokenizer: &T,
    options: &MatchOptions,
) -> Result<bool, PinyinRegexError> {
    one_shot(pattern, options)?.is_match_text(text, tokenizer, options)
}

/// Like [`is_match`], returning the matched token span.
pub fn find<T: Tokenize + ?Sized>(
    pattern: &str,
    text: &str,
    tokenizer: &T,
    options: &MatchOptions,
) -> Result<Option<Match>, PinyinRegexError> {
    one_shot(pattern, options)?.find_text(text, tokenizer, options)
}
