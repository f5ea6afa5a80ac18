//! The token contract between a tokenizer and the matcher.
//!
//! A [`Token`] is one unit of input text (normally a single Chinese
//! character) together with every spelling the pattern may use for it.
//! Producing tokens is the job of a [`Tokenize`] implementation; the
//! matcher only ever reads them.

use std::collections::BTreeSet;

use crate::error::TokenizationError;

/// One matchable unit of input text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    original: String,
    spellings: BTreeSet<String>,
    literal: char,
}

impl Token {
    /// Create a token from its source text, literal character and spellings.
    ///
    /// Duplicate and empty spellings are dropped.
    pub fn new<I, S>(original: impl Into<String>, literal: char, spellings: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let spellings = spellings
            .into_iter()
            .map(Into::into)
            .filter(|s: &String| !s.is_empty())
            .collect();
        Self {
            original: original.into(),
            spellings,
            literal,
        }
    }

    /// A token with no phonetic expansion, e.g. punctuation.
    pub fn literal_only(ch: char) -> Self {
        Self::new(ch.to_string(), ch, [ch.to_string()])
    }

    /// The source text this token was derived from.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The literal character used by class and escape predicates.
    pub fn literal(&self) -> char {
        self.literal
    }

    pub fn spellings(&self) -> impl Iterator<Item = &str> + '_ {
        self.spellings.iter().map(String::as_str)
    }

    pub fn has_spelling(&self, spelling: &str) -> bool {
        self.spellings.contains(spelling)
    }

    pub fn spelling_count(&self) -> usize {
        self.spellings.len()
    }

    /// True if the literal, rendered as a string, is also a spelling.
    pub(crate) fn spells_literal(&self) -> bool {
        let mut buf = [0u8; 4];
        self.spellings.contains(&*self.literal.encode_utf8(&mut buf))
    }
}

/// Options understood by tokenizers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TokenizeOptions {
    /// Include initial-letter spellings ("zh" for "zhong").
    pub use_initials: bool,
    /// Include zh/ch/sh → z/c/s fuzzy spellings.
    pub use_fuzzy: bool,
    /// One token per character; when false the whole text is one token.
    pub split_chars: bool,
}

impl Default for TokenizeOptions {
    fn default() -> Self {
        Self {
            use_initials: true,
            use_fuzzy: true,
            split_chars: true,
        }
    }
}

/// Converts raw text into tokens.
///
/// This is the boundary to the phonetic lookup service. The crate ships
/// [`PinyinTokenizer`](crate::PinyinTokenizer); any other source of
/// readings can implement this trait instead.
pub trait Tokenize {
    fn tokenize(
        &self,
        text: &str,
        options: &TokenizeOptions,
    ) -> Result<Vec<Token>, TokenizationError>;
}

impl<T: Tokenize + ?Sized> Tokenize for &T {
    fn tokenize(
        &self,
        text: &str,
        options: &TokenizeOptions,
    ) -> Result<Vec<Token>, TokenizationError> {
        (**self).tokenize(text, options)
    }
}

/// Tokenizer that performs no phonetic expansion.
///
/// Every character becomes a token whose only spelling is itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralTokenizer;

impl Tokenize for LiteralTokenizer {
    fn tokenize(
        &self,
        text: &str,
        options: &TokenizeOptions,
    ) -> Result<Vec<Token>, TokenizationError> {
        if options.split_chars {
            return Ok(text.chars().map(Token::literal_only).collect());
        }
        Ok(text
            .chars()
            .next()
            .map(|first| vec![Token::new(text, first, [text])])
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_dedups_spellings() {
        let token = Token::new("乐", '乐', ["yue", "le", "yue", "", "y"]);
        let spellings: Vec<_> = token.spellings().collect();
        assert_eq!(spellings, vec!["le", "y", "yue"]);
        assert_eq!(token.spelling_count(), 3);
        assert!(token.has_spelling("le"));
        assert!(!token.spells_literal());
    }

    #[test]
    fn test_token_without_spellings_keeps_literal() {
        let token = Token::new("，", '，', Vec::<String>::new());
        assert_eq!(token.spelling_count(), 0);
        assert_eq!(token.literal(), '，');
        assert_eq!(token.original(), "，");
    }

    #[test]
    fn test_literal_only() {
        let token = Token::literal_only('7');
        assert!(token.spells_literal());
        assert_eq!(token.spellings().collect::<Vec<_>>(), vec!["7"]);
    }

    #[test]
    fn test_literal_tokenizer() {
        let opts = TokenizeOptions::default();
        let tokens = LiteralTokenizer.tokenize("ab1", &opts).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[2].literal(), '1');

        let joined = TokenizeOptions {
            split_chars: false,
            ..opts
        };
        let tokens = LiteralTokenizer.tokenize("ab1", &joined).unwrap();
        assert_eq!(tokens.len(), 1);
        assert!(tokens[0].has_spelling("ab1"));
        assert_eq!(tokens[0].literal(), 'a');

        assert!(LiteralTokenizer.tokenize("", &joined).unwrap().is_empty());
    }
}
