//! Pinyin expansion and the bundled dictionary-backed tokenizer.
//!
//! The pronunciation dictionary itself is not part of the crate. Callers
//! fill a [`ReadingTable`] (by hand or from `pinyin-data` formatted text)
//! and hand it to [`PinyinTokenizer`], which expands every reading into the
//! spellings a pattern may use: the full spelling, its initial, and the
//! zh/ch/sh fuzzy variants.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::TokenizationError;
use crate::token::{Token, Tokenize, TokenizeOptions};

/// Pinyin initials, two-letter initials first so prefix search finds them.
pub const INITIALS: &[&str] = &[
    "zh", "ch", "sh", "b", "p", "m", "f", "d", "t", "n", "l", "g", "k", "h", "j", "q", "x", "r",
    "z", "c", "s", "y", "w",
];

/// Commonly confused initials: retroflex → flat.
pub const FUZZY_MAP: &[(&str, &str)] = &[("zh", "z"), ("ch", "c"), ("sh", "s")];

/// Cap on spellings generated for one unsplit token.
pub const MAX_JOINED_SPELLINGS: usize = 256;

/// Return the initial (声母) of a pinyin spelling.
///
/// Spellings without a listed initial fall back to their first letter.
pub fn shengmu(py: &str) -> &str {
    if let Some(ini) = INITIALS.iter().find(|ini| py.starts_with(**ini)) {
        return *ini;
    }
    py.chars().next().map_or("", |c| &py[..c.len_utf8()])
}

fn fuzzy_initial(initial: &str) -> Option<&'static str> {
    FUZZY_MAP
        .iter()
        .find(|(from, _)| *from == initial)
        .map(|(_, to)| *to)
}

/// Expand one reading into the spellings a pattern may use for it.
pub fn expand_pinyin(py: &str, use_initials: bool, use_fuzzy: bool) -> SmallVec<[String; 4]> {
    let mut out: SmallVec<[String; 4]> = SmallVec::new();
    let mut push = |s: String| {
        if !s.is_empty() && !out.contains(&s) {
            out.push(s);
        }
    };

    push(py.to_string());
    let initial = shengmu(py);
    if use_initials {
        push(initial.to_string());
    }
    if use_fuzzy {
        if let Some(flat) = fuzzy_initial(initial) {
            push(format!("{}{}", flat, &py[initial.len()..]));
            push(flat.to_string());
        }
    }
    out
}

/// Replace tone-marked vowels with their plain letters (`ü` becomes `v`).
pub fn strip_tones(py: &str) -> String {
    py.chars()
        .filter(|c| !('\u{0300}'..='\u{036F}').contains(c))
        .map(|c| match c {
            'ā' | 'á' | 'ǎ' | 'à' => 'a',
            'ē' | 'é' | 'ě' | 'è' | 'ê' => 'e',
            'ī' | 'í' | 'ǐ' | 'ì' => 'i',
            'ō' | 'ó' | 'ǒ' | 'ò' => 'o',
            'ū' | 'ú' | 'ǔ' | 'ù' => 'u',
            'ǖ' | 'ǘ' | 'ǚ' | 'ǜ' | 'ü' => 'v',
            'ń' | 'ň' | 'ǹ' => 'n',
            'ḿ' => 'm',
            other => other,
        })
        .flat_map(char::to_lowercase)
        .collect()
}

/// Character → readings dictionary.
///
/// Readings are stored tone-stripped and lowercase, in insertion order
/// without duplicates.
#[derive(Debug, Clone, Default)]
pub struct ReadingTable {
    readings: FxHashMap<char, SmallVec<[String; 2]>>,
}

impl ReadingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reading for `ch`. Tone marks are removed.
    pub fn insert(&mut self, ch: char, reading: &str) {
        let reading = strip_tones(reading.trim());
        if reading.is_empty() {
            return;
        }
        let entry = self.readings.entry(ch).or_default();
        if !entry.contains(&reading) {
            entry.push(reading);
        }
    }

    /// Readings of `ch`, empty when the character is unknown.
    pub fn readings(&self, ch: char) -> &[String] {
        self.readings.get(&ch).map(|r| r.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Parse `pinyin-data` formatted text.
    ///
    /// Each non-comment line is `U+XXXX: reading[,reading...]`, optionally
    /// followed by a `#` comment. The code point may also be written as the
    /// character itself (`音: yīn`).
    pub fn parse(source: &str) -> Result<Self, TokenizationError> {
        let mut table = Self::new();
        for (lineno, raw) in source.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let (key, readings) = line.split_once(':').ok_or_else(|| {
                TokenizationError::new(format!("line {}: missing ':'", lineno + 1))
            })?;
            let ch = parse_code_point(key.trim()).ok_or_else(|| {
                TokenizationError::new(format!(
                    "line {}: invalid code point '{}'",
                    lineno + 1,
                    key.trim()
                ))
            })?;
            for reading in readings.split(',') {
                table.insert(ch, reading);
            }
        }
        tracing::debug!(characters = table.len(), "reading table loaded");
        Ok(table)
    }
}

impl<'a> FromIterator<(char, &'a str)> for ReadingTable {
    fn from_iter<I: IntoIterator<Item = (char, &'a str)>>(iter: I) -> Self {
        let mut table = Self::new();
        for (ch, reading) in iter {
            table.insert(ch, reading);
        }
        table
    }
}

fn parse_code_point(key: &str) -> Option<char> {
    if let Some(hex) = key.strip_prefix("U+").or_else(|| key.strip_prefix("u+")) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    let mut chars = key.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

/// Tokenizer backed by a [`ReadingTable`].
#[derive(Debug, Clone, Default)]
pub struct PinyinTokenizer {
    table: ReadingTable,
}

impl PinyinTokenizer {
    pub fn new(table: ReadingTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ReadingTable {
        &self.table
    }

    /// All spellings for one character, including the character itself.
    fn char_spellings(&self, ch: char, options: &TokenizeOptions) -> SmallVec<[String; 4]> {
        let mut out: SmallVec<[String; 4]> = SmallVec::new();
        for reading in self.table.readings(ch) {
            for spelling in expand_pinyin(reading, options.use_initials, options.use_fuzzy) {
                if !out.contains(&spelling) {
                    out.push(spelling);
                }
            }
        }
        let own = ch.to_string();
        if !out.contains(&own) {
            out.push(own);
        }
        out
    }

    fn joined_token(&self, text: &str, first: char, options: &TokenizeOptions) -> Token {
        let mut joined = vec![String::new()];
        for ch in text.chars() {
            let spellings = self.char_spellings(ch, options);
            let mut next = Vec::with_capacity(joined.len() * spellings.len());
            'outer: for prefix in &joined {
                for s in &spellings {
                    if next.len() == MAX_JOINED_SPELLINGS {
                        break 'outer;
                    }
                    next.push(format!("{}{}", prefix, s));
                }
            }
            joined = next;
        }
        joined.push(text.to_string());
        Token::new(text, first, joined)
    }
}

impl Tokenize for PinyinTokenizer {
    fn tokenize(
        &self,
        text: &str,
        options: &TokenizeOptions,
    ) -> Result<Vec<Token>, TokenizationError> {
        let tokens: Vec<Token> = if options.split_chars {
            text.chars()
                .map(|ch| Token::new(ch.to_string(), ch, self.char_spellings(ch, options)))
                .collect()
        } else {
            text.chars()
                .next()
                .map(|first| vec![self.joined_token(text, first, options)])
                .unwrap_or_default()
        };
        tracing::debug!(
            chars = text.chars().count(),
            tokens = tokens.len(),
            split = options.split_chars,
            "tokenized text"
        );
        Ok(tokens)
    }
}
