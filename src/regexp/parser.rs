//! Pattern parsing.
//!
//! Recursive descent over the pattern text, producing a [`Node`] tree.
//! Supports:
//! - literal runs (`yinyue`), kept as one node per run
//! - `.` any single unit
//! - `[...]` / `[^...]` character classes with `a-z` ranges
//! - `\d \w \s` (and `\D \W \S`) classes, `\z` whole-token wildcard
//! - `(...)` grouping and `|` alternation
//! - `*`, `+`, `?`, `{m}`, `{m,}`, `{m,n}` quantifiers
//! - `^` / `$` anchors at the edges of a top-level branch
//!
//! The escape character is `\`.

use crate::error::PatternSyntaxError;

/// Largest bound accepted in `{m,n}`.
pub const REPEAT_MAX: u32 = 1000;

/// Deepest nesting of groups and quantifiers accepted.
pub const NEST_LIMIT: usize = 250;

const ESCAPE: char = '\\';

/// A pair of runes representing an inclusive range [lo, hi].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunePair {
    pub lo: char,
    pub hi: char,
}

impl RunePair {
    pub const fn single(c: char) -> Self {
        Self { lo: c, hi: c }
    }

    pub const fn new(lo: char, hi: char) -> Self {
        Self { lo, hi }
    }
}

/// A collection of rune pairs representing a character class.
pub type RuneRange = Vec<RunePair>;

/// A bracketed character class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharClass {
    /// Sorted, non-overlapping ranges.
    pub ranges: RuneRange,
    pub negated: bool,
}

impl CharClass {
    pub fn new(ranges: RuneRange, negated: bool) -> Self {
        Self {
            ranges: simplify_rune_range(ranges),
            negated,
        }
    }

    pub fn contains(&self, c: char) -> bool {
        let found = self
            .ranges
            .binary_search_by(|rp| {
                if rp.hi < c {
                    std::cmp::Ordering::Less
                } else if rp.lo > c {
                    std::cmp::Ordering::Greater
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok();
        found != self.negated
    }
}

/// Which backslash class an escape names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscapeKind {
    /// `\d`
    Digit,
    /// `\w`: ASCII letters, digits and `_`
    Word,
    /// `\s`
    Space,
    /// `\z`: any single token, whatever its spellings
    AnyToken,
}

/// A backslash class such as `\d` or `\W`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Escape {
    pub kind: EscapeKind,
    pub negated: bool,
}

impl Escape {
    pub const fn new(kind: EscapeKind) -> Self {
        Self {
            kind,
            negated: false,
        }
    }

    /// Test a token's literal character against this class.
    pub fn matches(&self, literal: char) -> bool {
        let hit = match self.kind {
            EscapeKind::Digit => literal.is_ascii_digit(),
            EscapeKind::Word => literal.is_ascii_alphanumeric() || literal == '_',
            EscapeKind::Space => literal.is_whitespace(),
            EscapeKind::AnyToken => true,
        };
        hit != self.negated
    }
}

/// Parsed pattern tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A run of plain characters, matched one character per transition.
    Literal(String),
    AnyChar,
    CharClass(CharClass),
    Escape(Escape),
    Concat(Vec<Node>),
    Alternation(Vec<Node>),
    Group(Box<Node>),
    /// `max: None` means unbounded.
    Repeat {
        node: Box<Node>,
        min: u32,
        max: Option<u32>,
    },
    StartAnchor,
    EndAnchor,
}

impl Node {
    /// The empty sequence, matching without consuming anything.
    pub fn empty() -> Self {
        Node::Concat(Vec::new())
    }

    pub fn repeat(node: Node, min: u32, max: Option<u32>) -> Self {
        Node::Repeat {
            node: Box::new(node),
            min,
            max,
        }
    }

    /// Top-level branches of the tree.
    pub fn branches(&self) -> &[Node] {
        match self {
            Node::Alternation(branches) => branches,
            other => std::slice::from_ref(other),
        }
    }
}

/// Parser state for pattern parsing.
struct RegexpParse<'p> {
    pattern: &'p str,
    index: usize,
    last_index: usize,
    depth: usize,
}

impl<'p> RegexpParse<'p> {
    fn new(pattern: &'p str) -> Self {
        Self {
            pattern,
            index: 0,
            last_index: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.pattern[self.index..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.pattern[self.index..].chars();
        chars.next();
        chars.next()
    }

    fn next_rune(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.last_index = self.index;
        self.index += c.len_utf8();
        Some(c)
    }

    fn bypass_optional(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.next_rune();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> PatternSyntaxError {
        PatternSyntaxError::new(message, self.last_index)
    }
}

/// Parse a pattern string into a tree.
pub fn parse_pattern(pattern: &str) -> Result<Node, PatternSyntaxError> {
    if pattern.is_empty() {
        return Err(PatternSyntaxError::new("empty pattern", 0));
    }

    let mut parse = RegexpParse::new(pattern);
    let (root, _) = read_alternation(&mut parse)?;

    if let Some(c) = parse.next_rune() {
        // read_alternation only stops early on ')'
        return Err(parse.error(format!("unbalanced '{}'", c)));
    }
    Ok(root)
}

/// A parsed node and the number of groups and quantifiers nested in it.
type Nested = (Node, usize);

fn nesting_error(offset: usize) -> PatternSyntaxError {
    PatternSyntaxError::new(
        format!("groups and quantifiers nested deeper than {}", NEST_LIMIT),
        offset,
    )
}

/// Read branches separated by `|`.
fn read_alternation(parse: &mut RegexpParse<'_>) -> Result<Nested, PatternSyntaxError> {
    let (first, mut height) = read_branch(parse)?;
    let mut branches = vec![first];
    while parse.bypass_optional('|') {
        let (branch, h) = read_branch(parse)?;
        height = height.max(h);
        branches.push(branch);
    }

    if branches.len() == 1 {
        Ok((branches.remove(0), height))
    } else {
        Ok((Node::Alternation(branches), height))
    }
}

/// Read a single branch (sequence of pieces).
fn read_branch(parse: &mut RegexpParse<'_>) -> Result<Nested, PatternSyntaxError> {
    let mut pieces: Vec<Node> = Vec::new();
    let mut height = 0;

    while let Some(c) = parse.peek() {
        match c {
            '|' | ')' => break,
            '^' => {
                parse.next_rune();
                if parse.depth > 0 || !pieces.is_empty() {
                    return Err(parse.error("'^' is only allowed at the start of a branch"));
                }
                pieces.push(Node::StartAnchor);
            }
            '$' => {
                parse.next_rune();
                let at_branch_end = matches!(parse.peek(), None | Some('|'));
                if parse.depth > 0 || !at_branch_end {
                    return Err(parse.error("'$' is only allowed at the end of a branch"));
                }
                pieces.push(Node::EndAnchor);
            }
            _ => {
                let (piece, h) = read_piece(parse)?;
                height = height.max(h);
                pieces.push(piece);
            }
        }
    }

    let mut pieces = merge_literal_runs(pieces);
    let node = match pieces.len() {
        0 => Node::empty(),
        1 => pieces.remove(0),
        _ => Node::Concat(pieces),
    };
    Ok((node, height))
}

/// Join adjacent unquantified literals into a single run.
fn merge_literal_runs(pieces: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        if let Node::Literal(next) = &piece {
            if let Some(Node::Literal(run)) = out.last_mut() {
                run.push_str(next);
                continue;
            }
        }
        out.push(piece);
    }
    out
}

/// Read a piece (atom with optional quantifiers).
fn read_piece(parse: &mut RegexpParse<'_>) -> Result<Nested, PatternSyntaxError> {
    let (mut atom, mut height) = read_atom(parse)?;
    while let Some((min, max)) = read_quantifier(parse)? {
        height += 1;
        if parse.depth + height > NEST_LIMIT {
            return Err(nesting_error(parse.last_index));
        }
        atom = Node::repeat(atom, min, max);
    }
    Ok((atom, height))
}

/// Read an atom.
fn read_atom(parse: &mut RegexpParse<'_>) -> Result<Nested, PatternSyntaxError> {
    let Some(b) = parse.next_rune() else {
        return Err(parse.error("unexpected end of pattern"));
    };

    match b {
        '.' => Ok((Node::AnyChar, 0)),
        '(' => {
            let open = parse.last_index;
            if parse.depth == NEST_LIMIT {
                return Err(nesting_error(open));
            }
            parse.depth += 1;
            let (inner, height) = read_alternation(parse)?;
            parse.depth -= 1;
            if !parse.bypass_optional(')') {
                return Err(PatternSyntaxError::new("unclosed '('", open));
            }
            Ok((Node::Group(Box::new(inner)), height + 1))
        }
        '[' => Ok((Node::CharClass(read_char_class_expr(parse)?), 0)),
        ']' => Err(parse.error("unbalanced ']'")),
        '}' => Err(parse.error("unbalanced '}'")),
        '?' | '+' | '*' | '{' => Err(parse.error(format!(
            "invalid character '{}' (quantifier without atom)",
            b
        ))),
        c if c == ESCAPE => {
            let Some(next) = parse.next_rune() else {
                return Err(parse.error(format!("'{}' at end of pattern", ESCAPE)));
            };
            if let Some(escape) = check_class_escape(next) {
                return Ok((Node::Escape(escape), 0));
            }
            Ok((Node::Literal(check_single_char_escape(next).to_string()), 0))
        }
        c => Ok((Node::Literal(c.to_string()), 0)),
    }
}

/// Map `\n`, `\r`, `\t` to control characters; anything else stands for itself.
fn check_single_char_escape(c: char) -> char {
    match c {
        'n' => '\n',
        'r' => '\r',
        't' => '\t',
        other => other,
    }
}

fn check_class_escape(c: char) -> Option<Escape> {
    let (kind, negated) = match c {
        'd' => (EscapeKind::Digit, false),
        'D' => (EscapeKind::Digit, true),
        'w' => (EscapeKind::Word, false),
        'W' => (EscapeKind::Word, true),
        's' => (EscapeKind::Space, false),
        'S' => (EscapeKind::Space, true),
        'z' => (EscapeKind::AnyToken, false),
        _ => return None,
    };
    Some(Escape { kind, negated })
}

/// Ranges for `\d`, `\w`, `\s` inside a bracketed class.
fn class_escape_ranges(c: char) -> Option<RuneRange> {
    match c {
        'd' => Some(vec![RunePair::new('0', '9')]),
        'w' => Some(vec![
            RunePair::new('a', 'z'),
            RunePair::new('A', 'Z'),
            RunePair::new('0', '9'),
            RunePair::single('_'),
        ]),
        's' => Some(vec![
            RunePair::single(' '),
            RunePair::new('\t', '\r'),
        ]),
        _ => None,
    }
}

/// Read a quantifier (?, *, +, {m,n}) if one follows.
fn read_quantifier(
    parse: &mut RegexpParse<'_>,
) -> Result<Option<(u32, Option<u32>)>, PatternSyntaxError> {
    let quant = match parse.peek() {
        Some('*') => (0, None),
        Some('+') => (1, None),
        Some('?') => (0, Some(1)),
        Some('{') => {
            parse.next_rune();
            return read_range_quantifier(parse).map(Some);
        }
        _ => return Ok(None),
    };
    parse.next_rune();
    Ok(Some(quant))
}

fn read_bound(parse: &mut RegexpParse<'_>) -> Result<Option<u32>, PatternSyntaxError> {
    let start = parse.index;
    while parse.peek().is_some_and(|c| c.is_ascii_digit()) {
        parse.next_rune();
    }
    let digits = &parse.pattern[start..parse.index];
    if digits.is_empty() {
        return Ok(None);
    }
    let bound: u32 = digits
        .parse()
        .map_err(|_| PatternSyntaxError::new("invalid number in quantifier", start))?;
    if bound > REPEAT_MAX {
        return Err(PatternSyntaxError::new(
            format!("quantifier bound {} exceeds {}", bound, REPEAT_MAX),
            start,
        ));
    }
    Ok(Some(bound))
}

/// Read a range quantifier body after `{`.
fn read_range_quantifier(
    parse: &mut RegexpParse<'_>,
) -> Result<(u32, Option<u32>), PatternSyntaxError> {
    let open = parse.last_index;

    let Some(min) = read_bound(parse)? else {
        return Err(match parse.peek() {
            None => PatternSyntaxError::new("unterminated quantifier", open),
            Some(_) => {
                parse.next_rune();
                parse.error("invalid range quantifier, expecting digits")
            }
        });
    };

    let max = if parse.bypass_optional(',') {
        read_bound(parse)?
    } else {
        Some(min)
    };

    match parse.next_rune() {
        Some('}') => {}
        Some(c) => {
            return Err(parse.error(format!("unexpected character '{}' in quantifier", c)))
        }
        None => return Err(PatternSyntaxError::new("unterminated quantifier", open)),
    }

    if let Some(max) = max {
        if min > max {
            return Err(PatternSyntaxError::new(
                format!("invalid range quantifier, min {} greater than max {}", min, max),
                open,
            ));
        }
    }
    Ok((min, max))
}

/// Read a character class expression after `[`.
fn read_char_class_expr(parse: &mut RegexpParse<'_>) -> Result<CharClass, PatternSyntaxError> {
    let open = parse.last_index;
    let negated = parse.bypass_optional('^');

    if parse.peek() == Some(']') {
        parse.next_rune();
        return Err(parse.error("empty character class"));
    }

    let mut rr = RuneRange::new();
    loop {
        let Some(c) = parse.next_rune() else {
            return Err(PatternSyntaxError::new("unclosed character class", open));
        };
        if c == ']' {
            break;
        }

        let lo = if c == ESCAPE {
            let Some(next) = parse.next_rune() else {
                return Err(PatternSyntaxError::new("unclosed character class", open));
            };
            if let Some(ranges) = class_escape_ranges(next) {
                rr.extend(ranges);
                continue;
            }
            if check_class_escape(next).is_some() {
                return Err(parse.error(format!(
                    "'{}{}' cannot be used inside a character class",
                    ESCAPE, next
                )));
            }
            check_single_char_escape(next)
        } else {
            c
        };

        // a '-' right before ']' is literal
        if parse.peek() == Some('-') && !matches!(parse.peek_second(), Some(']') | None) {
            parse.next_rune();
            let hi = match parse.next_rune() {
                Some(h) if h == ESCAPE => match parse.next_rune() {
                    Some(escaped) => check_single_char_escape(escaped),
                    None => return Err(PatternSyntaxError::new("unclosed character class", open)),
                },
                Some(h) => h,
                None => return Err(PatternSyntaxError::new("unclosed character class", open)),
            };
            if lo > hi {
                return Err(parse.error(format!("invalid range {}-{}", lo, hi)));
            }
            rr.push(RunePair::new(lo, hi));
        } else {
            rr.push(RunePair::single(lo));
        }
    }

    Ok(CharClass::new(rr, negated))
}

/// Sort and merge overlapping or adjacent rune ranges.
pub fn simplify_rune_range(mut rranges: RuneRange) -> RuneRange {
    if rranges.is_empty() {
        return rranges;
    }

    rranges.sort_by_key(|rp| rp.lo);

    let mut out = Vec::with_capacity(rranges.len());
    let mut current = rranges[0];

    for next in rranges.iter().skip(1).copied() {
        if next.lo as u32 > current.hi as u32 + 1 {
            out.push(current);
            current = next;
            continue;
        }
        if next.hi > current.hi {
            current.hi = next.hi;
        }
    }
    out.push(current);
    out
}
