//! Token-level frontier simulation.
//!
//! The frontier is the set of automaton states consistent with every token
//! consumed so far. Advancing over one token means trying each of its
//! candidate spellings from every frontier state: a candidate succeeds only
//! if all of its characters are consumed along one chain of transitions
//! (epsilon moves allowed in between). The union of the states reached by
//! all successful candidates, epsilon-closed, is the next frontier.
//!
//! Acceptance is only checked at token boundaries, so a spelling is never
//! half consumed.

use crate::regexp::Nfa;
use crate::token::Token;

use super::arena::{Predicate, StateId};
use super::state_set::StateSet;

/// Where a match must begin and end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Anchoring {
    /// Any substring of the token sequence.
    #[default]
    None,
    /// Must start at the first token.
    Start,
    /// Must end at the last token.
    End,
    /// Must cover the whole token sequence.
    Both,
}

impl Anchoring {
    pub fn from_flags(start: bool, end: bool) -> Self {
        match (start, end) {
            (false, false) => Anchoring::None,
            (true, false) => Anchoring::Start,
            (false, true) => Anchoring::End,
            (true, true) => Anchoring::Both,
        }
    }

    #[inline]
    pub fn requires_start(self) -> bool {
        matches!(self, Anchoring::Start | Anchoring::Both)
    }

    #[inline]
    pub fn requires_end(self) -> bool {
        matches!(self, Anchoring::End | Anchoring::Both)
    }

    /// Both sets of requirements at once.
    pub fn union(self, other: Anchoring) -> Self {
        Self::from_flags(
            self.requires_start() || other.requires_start(),
            self.requires_end() || other.requires_end(),
        )
    }
}

/// Which strings of a token the automaton may consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CandidateMode {
    /// Every spelling, plus the literal character.
    #[default]
    Spellings,
    /// Only the literal character.
    Literal,
}

/// A matched span of tokens, `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Match {
    pub start: usize,
    pub end: usize,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// Progress reported to a [`MatchObserver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// A new start offset is being tried.
    OffsetStarted { offset: usize },
    /// The token at `position` was consumed; `frontier` states survive.
    TokenConsumed { position: usize, frontier: usize },
    /// No state survived the token at `position`.
    Dead { offset: usize, position: usize },
    /// The frontier contains the accept state at a valid end.
    Accepted { start: usize, end: usize },
}

/// Receives matcher progress. Pass one explicitly to the `*_observed` calls.
pub trait MatchObserver {
    fn observe(&mut self, event: MatchEvent);
}

impl MatchObserver for () {
    fn observe(&mut self, _event: MatchEvent) {}
}

impl<F: FnMut(MatchEvent)> MatchObserver for F {
    fn observe(&mut self, event: MatchEvent) {
        self(event)
    }
}

/// Observer that tallies matcher work.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepCounter {
    pub offsets: usize,
    pub tokens: usize,
    pub dead_ends: usize,
    pub accepts: usize,
    pub peak_frontier: usize,
}

impl MatchObserver for StepCounter {
    fn observe(&mut self, event: MatchEvent) {
        match event {
            MatchEvent::OffsetStarted { .. } => self.offsets += 1,
            MatchEvent::TokenConsumed { frontier, .. } => {
                self.tokens += 1;
                self.peak_frontier = self.peak_frontier.max(frontier);
            }
            MatchEvent::Dead { .. } => self.dead_ends += 1,
            MatchEvent::Accepted { .. } => self.accepts += 1,
        }
    }
}

/// Runs an automaton against token sequences.
///
/// Cheap to create; holds only a borrow of the automaton. Each call
/// allocates its own frontier buffers, so one matcher may be used from
/// several threads at once.
#[derive(Debug, Clone, Copy)]
pub struct FrontierMatcher<'n> {
    nfa: &'n Nfa,
    mode: CandidateMode,
    anchoring: Anchoring,
}

impl<'n> FrontierMatcher<'n> {
    /// A matcher using the automaton's own anchoring and spelling mode.
    pub fn new(nfa: &'n Nfa) -> Self {
        Self {
            nfa,
            mode: CandidateMode::default(),
            anchoring: nfa.anchoring(),
        }
    }

    pub fn with_mode(mut self, mode: CandidateMode) -> Self {
        self.mode = mode;
        self
    }

    /// Add anchoring requirements on top of the pattern's own.
    pub fn with_anchoring(mut self, anchoring: Anchoring) -> Self {
        self.anchoring = self.nfa.anchoring().union(anchoring);
        self
    }

    pub fn anchoring(&self) -> Anchoring {
        self.anchoring
    }

    pub fn is_match(&self, tokens: &[Token]) -> bool {
        self.is_match_observed(tokens, &mut ())
    }

    pub fn is_match_observed(&self, tokens: &[Token], observer: &mut dyn MatchObserver) -> bool {
        self.search(tokens, true, observer).is_some()
    }

    /// Leftmost match, extended as far as the frontier survives.
    pub fn find(&self, tokens: &[Token]) -> Option<Match> {
        self.find_observed(tokens, &mut ())
    }

    pub fn find_observed(
        &self,
        tokens: &[Token],
        observer: &mut dyn MatchObserver,
    ) -> Option<Match> {
        self.search(tokens, false, observer)
    }

    fn search(
        &self,
        tokens: &[Token],
        first_accept: bool,
        observer: &mut dyn MatchObserver,
    ) -> Option<Match> {
        let last_offset = if self.anchoring.requires_start() {
            0
        } else {
            tokens.len()
        };

        let mut frontier = Frontier::new(self.nfa, self.mode);
        for offset in 0..=last_offset {
            if let Some(end) = frontier.run_from(
                tokens,
                offset,
                self.anchoring.requires_end(),
                first_accept,
                observer,
            ) {
                return Some(Match { start: offset, end });
            }
        }
        None
    }
}

/// Match `tokens` against `nfa` with extra anchoring.
pub fn run(nfa: &Nfa, tokens: &[Token], anchoring: Anchoring) -> bool {
    FrontierMatcher::new(nfa)
        .with_anchoring(anchoring)
        .is_match(tokens)
}

/// States reachable from `states` through plain epsilon transitions.
///
/// Anchor edges are not followed. The input states are included.
pub fn epsilon_closure(nfa: &Nfa, states: &[StateId]) -> Vec<StateId> {
    let mut set = StateSet::new(nfa.len());
    for &id in states {
        set.insert(id);
    }
    let mut stack = Vec::new();
    close(nfa, &mut set, &mut stack, None);
    set.iter().collect()
}

/// Epsilon-close `set` in place.
///
/// `at` is `(position, len)` at a token boundary, enabling anchor edges
/// whose condition holds there; `None` inside a spelling.
fn close(nfa: &Nfa, set: &mut StateSet, stack: &mut Vec<StateId>, at: Option<(usize, usize)>) {
    stack.clear();
    stack.extend_from_slice(set.as_slice());

    let arena = nfa.arena();
    while let Some(id) = stack.pop() {
        let state = &arena[id];
        for &next in &state.epsilons {
            if set.insert(next) {
                stack.push(next);
            }
        }
        if let Some((position, len)) = at {
            for &(anchor, next) in &state.anchors {
                if anchor.holds(position, len) && set.insert(next) {
                    stack.push(next);
                }
            }
        }
    }
}

/// Per-call simulation buffers.
struct Frontier<'n> {
    nfa: &'n Nfa,
    mode: CandidateMode,
    current: StateSet,
    next: StateSet,
    walk: StateSet,
    walk_next: StateSet,
    stack: Vec<StateId>,
}

impl<'n> Frontier<'n> {
    fn new(nfa: &'n Nfa, mode: CandidateMode) -> Self {
        let capacity = nfa.len();
        Self {
            nfa,
            mode,
            current: StateSet::new(capacity),
            next: StateSet::new(capacity),
            walk: StateSet::new(capacity),
            walk_next: StateSet::new(capacity),
            stack: Vec::with_capacity(16),
        }
    }

    /// Simulate from `offset`, returning the end of a match if one is found.
    ///
    /// With `first_accept` the earliest valid end is returned; otherwise the
    /// latest one reached before the frontier dies or input runs out.
    fn run_from(
        &mut self,
        tokens: &[Token],
        offset: usize,
        require_end: bool,
        first_accept: bool,
        observer: &mut dyn MatchObserver,
    ) -> Option<usize> {
        let len = tokens.len();
        observer.observe(MatchEvent::OffsetStarted { offset });

        self.current.clear();
        self.current.insert(self.nfa.start());
        close(self.nfa, &mut self.current, &mut self.stack, Some((offset, len)));

        let mut best = None;
        if self.accepting(offset, len, require_end) {
            observer.observe(MatchEvent::Accepted {
                start: offset,
                end: offset,
            });
            best = Some(offset);
            if first_accept {
                return best;
            }
        }

        for (position, token) in tokens.iter().enumerate().skip(offset) {
            if !self.advance(token, position + 1, len) {
                tracing::trace!(offset, position, "frontier died");
                observer.observe(MatchEvent::Dead { offset, position });
                break;
            }
            observer.observe(MatchEvent::TokenConsumed {
                position,
                frontier: self.current.len(),
            });

            if self.accepting(position + 1, len, require_end) {
                tracing::trace!(offset, end = position + 1, "frontier accepted");
                observer.observe(MatchEvent::Accepted {
                    start: offset,
                    end: position + 1,
                });
                best = Some(position + 1);
                if first_accept {
                    return best;
                }
            }
        }
        best
    }

    fn accepting(&self, position: usize, len: usize, require_end: bool) -> bool {
        (!require_end || position == len) && self.current.contains(self.nfa.accept())
    }

    /// Consume one token, landing at text position `after`.
    ///
    /// Returns false if the new frontier is empty.
    fn advance(&mut self, token: &Token, after: usize, len: usize) -> bool {
        self.next.clear();

        // \z steps over the whole token
        let nfa = self.nfa;
        let arena = nfa.arena();
        for id in self.current.iter() {
            for (predicate, target) in &arena[id].steps {
                if matches!(predicate, Predicate::AnyToken) {
                    self.next.insert(*target);
                }
            }
        }

        let literal = token.literal();
        match self.mode {
            CandidateMode::Spellings => {
                for spelling in token.spellings() {
                    self.walk_candidate(spelling.chars(), literal);
                }
                if !token.spells_literal() {
                    self.walk_candidate(std::iter::once(literal), literal);
                }
            }
            CandidateMode::Literal => self.walk_candidate(std::iter::once(literal), literal),
        }

        close(self.nfa, &mut self.next, &mut self.stack, Some((after, len)));
        std::mem::swap(&mut self.current, &mut self.next);
        !self.current.is_empty()
    }

    /// Walk one candidate from the whole current frontier, adding the
    /// states that consumed every character to `next`.
    fn walk_candidate(&mut self, units: impl Iterator<Item = char>, literal: char) {
        let nfa = self.nfa;
        let arena = nfa.arena();
        self.walk.copy_from(&self.current);

        let mut consumed = false;
        for unit in units {
            consumed = true;
            self.walk_next.clear();
            for id in self.walk.iter() {
                for (predicate, target) in &arena[id].steps {
                    if predicate.matches_unit(unit, literal) {
                        self.walk_next.insert(*target);
                    }
                }
            }
            if self.walk_next.is_empty() {
                return;
            }
            std::mem::swap(&mut self.walk, &mut self.walk_next);
            close(self.nfa, &mut self.walk, &mut self.stack, None);
        }

        if consumed {
            for id in self.walk.iter() {
                self.next.insert(id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regexp::{compile_ast, parse_pattern};

    fn compile(pattern: &str) -> Nfa {
        compile_ast(&parse_pattern(pattern).unwrap()).unwrap()
    }

    /// Spellings as a fuzzy, initial-expanding tokenizer would produce them.
    fn spellings_of(ch: char) -> &'static [&'static str] {
        match ch {
            '音' => &["yin", "y"],
            '乐' => &["yue", "y", "le", "l"],
            '了' => &["le", "l"],
            '中' => &["zhong", "zh", "zong", "z"],
            '家' => &["jia", "j"],
            '能' => &["neng", "n"],
            '我' => &["wo", "w"],
            '的' => &["de", "d"],
            '很' => &["hen", "h"],
            '好' => &["hao", "h"],
            '听' => &["ting", "t"],
            _ => &[],
        }
    }

    fn text(s: &str) -> Vec<Token> {
        s.chars()
            .map(|ch| {
                let own = ch.to_string();
                let spellings = spellings_of(ch)
                    .iter()
                    .map(|s| s.to_string())
                    .chain(std::iter::once(own.clone()));
                Token::new(own, ch, spellings)
            })
            .collect()
    }

    fn matches(pattern: &str, s: &str) -> bool {
        FrontierMatcher::new(&compile(pattern)).is_match(&text(s))
    }

    #[test]
    fn test_full_and_initial_spellings() {
        assert!(matches("yinyue", "音乐"));
        assert!(matches("yy", "音乐"));
        assert!(matches("yinle", "音乐"));
        assert!(matches("yin(yue|le)", "音乐"));
        assert!(matches("y{1,2}", "音乐"));
        assert!(!matches("yinyuan", "音乐"));
    }

    #[test]
    fn test_spelling_is_atomic() {
        // "yu" is a prefix of "yue" but not a spelling of 乐
        assert!(!matches("yinyu", "音乐"));
        assert!(!matches("^yi$", "音"));
        assert!(matches("^yin$", "音"));
    }

    #[test]
    fn test_fuzzy_spelling() {
        assert!(matches("zong", "中"));
        let strict = vec![Token::new("中", '中', ["zhong", "zh", "中"])];
        assert!(!FrontierMatcher::new(&compile("zong")).is_match(&strict));
    }

    #[test]
    fn test_unit_predicates() {
        assert!(matches("y.n", "音"));
        assert!(matches("[yl]in", "音"));
        assert!(!matches("[^z]hong", "中"));
        assert!(matches("[^x]ue", "乐"));
    }

    #[test]
    fn test_escapes_test_literal() {
        assert!(!matches(r"\w+", "音乐"));
        assert!(!matches(r"\d+", "音乐"));
        assert!(matches(r"\W", "音"));
        assert!(matches(r"yin\d", "音1"));
        assert!(!matches(r"yin\D", "音1"));
    }

    #[test]
    fn test_any_token() {
        assert!(matches(r"\z\z", "音乐"));
        assert!(!matches(r"^\z\z\z$", "音乐"));
        assert!(matches(r"yin\zjia", "音乐家"));
        assert!(!matches(r"\z", ""));
    }

    #[test]
    fn test_empty_text() {
        assert!(matches("y{0}", ""));
        assert!(matches("y?", ""));
        assert!(!matches(".", ""));
        assert!(!matches("yin", ""));
    }

    #[test]
    fn test_repeated_groups() {
        assert!(matches("(y(yue|le)){2}", "音乐音乐"));
        assert!(matches("yin(yue|le){2}", "音乐了"));
        assert!(matches("yin{2}", "音能"));
        assert!(!matches("^(yue|le){3}$", "乐了"));
    }

    #[test]
    fn test_pattern_anchors() {
        assert!(!matches("^yin(yue|le)$", "音乐家"));
        assert!(matches("^yin(yue|le)", "音乐家"));
        assert!(matches("yue$", "音乐"));
        assert!(!matches("^yue", "音乐"));
        assert!(matches("^$", ""));
    }

    #[test]
    fn test_substring_search() {
        assert!(matches("yue", "我的音乐很好听"));
        assert!(matches("hh", "我的音乐很好听"));
        assert!(!matches("hhh", "我的音乐很好听"));
    }

    #[test]
    fn test_caller_anchoring() {
        let nfa = compile("yue");
        let tokens = text("音乐");
        assert!(run(&nfa, &tokens, Anchoring::None));
        assert!(run(&nfa, &tokens, Anchoring::End));
        assert!(!run(&nfa, &tokens, Anchoring::Start));
        assert!(!run(&nfa, &tokens, Anchoring::Both));
        assert!(run(&compile("yinyue"), &tokens, Anchoring::Both));
    }

    #[test]
    fn test_anchoring_union() {
        let nfa = compile("^yin");
        let matcher = FrontierMatcher::new(&nfa).with_anchoring(Anchoring::End);
        assert_eq!(matcher.anchoring(), Anchoring::Both);
        assert!(matcher.is_match(&text("音")));
        assert!(!matcher.is_match(&text("音乐")));

        assert_eq!(Anchoring::None.union(Anchoring::Start), Anchoring::Start);
        assert_eq!(Anchoring::from_flags(false, true), Anchoring::End);
    }

    #[test]
    fn test_literal_mode() {
        let tokens = text("音乐");
        let literal = |pattern: &str| {
            FrontierMatcher::new(&compile(pattern))
                .with_mode(CandidateMode::Literal)
                .is_match(&tokens)
        };
        assert!(!literal("yin"));
        assert!(literal("音乐"));
        assert!(literal("^.乐$"));
        assert!(literal(r"\z"));
    }

    #[test]
    fn test_literal_is_always_a_candidate() {
        // token whose spellings do not include its own character
        let tokens = vec![Token::new("音", '音', ["yin"])];
        assert!(FrontierMatcher::new(&compile("音")).is_match(&tokens));
    }

    #[test]
    fn test_token_without_spellings() {
        let tokens = vec![Token::new("，", '，', Vec::<String>::new())];
        assert!(tokens[0].spellings().next().is_none());
        for pattern in ["，", "^.$", r"\z", r"^\z$"] {
            assert!(
                FrontierMatcher::new(&compile(pattern)).is_match(&tokens),
                "pattern {:?}",
                pattern
            );
        }
        assert!(!FrontierMatcher::new(&compile("yin")).is_match(&tokens));
        assert!(!FrontierMatcher::new(&compile("^..$")).is_match(&tokens));
    }

    #[test]
    fn test_digit_escape_agrees_with_class() {
        let escape = compile(r"^\d$");
        let class = compile(r"^[\d]$");
        for ch in ['0', '7', '½', '①', '٣', 'a'] {
            let tokens = vec![Token::literal_only(ch)];
            assert_eq!(
                FrontierMatcher::new(&escape).is_match(&tokens),
                FrontierMatcher::new(&class).is_match(&tokens),
                "{:?}",
                ch
            );
        }
        assert!(!FrontierMatcher::new(&escape).is_match(&[Token::literal_only('½')]));
        assert!(FrontierMatcher::new(&escape).is_match(&[Token::literal_only('7')]));
    }

    #[test]
    fn test_find_leftmost_longest() {
        let nfa = compile("yue");
        let found = FrontierMatcher::new(&nfa).find(&text("我的音乐"));
        assert_eq!(found, Some(Match { start: 3, end: 4 }));

        let nfa = compile("y+");
        let found = FrontierMatcher::new(&nfa).find(&text("我音乐"));
        assert_eq!(found.map(|m| m.range()), Some(1..3));

        let nfa = compile("y?");
        let found = FrontierMatcher::new(&nfa).find(&text("中"));
        assert_eq!(found, Some(Match { start: 0, end: 0 }));
        assert!(found.is_some_and(|m| m.is_empty()));

        assert_eq!(FrontierMatcher::new(&compile("jia")).find(&text("音乐")), None);
    }

    #[test]
    fn test_step_counter() {
        let nfa = compile("yue");
        let mut counter = StepCounter::default();
        assert!(FrontierMatcher::new(&nfa).is_match_observed(&text("音乐"), &mut counter));
        // offset 0 survives 音 via "y", then dies on 乐; offset 1 accepts
        assert_eq!(counter.offsets, 2);
        assert_eq!(counter.tokens, 2);
        assert_eq!(counter.dead_ends, 1);
        assert_eq!(counter.accepts, 1);
        assert!(counter.peak_frontier >= 1);
    }

    #[test]
    fn test_closure_observer() {
        let nfa = compile("^yin");
        let mut events = Vec::new();
        let mut record = |event: MatchEvent| events.push(event);
        assert!(!FrontierMatcher::new(&nfa).is_match_observed(&text("乐音"), &mut record));
        // start-anchored: only offset 0 is tried
        assert_eq!(events.first(), Some(&MatchEvent::OffsetStarted { offset: 0 }));
        assert_eq!(
            events
                .iter()
                .filter(|e| matches!(e, MatchEvent::OffsetStarted { .. }))
                .count(),
            1
        );
    }

    #[test]
    fn test_epsilon_closure() {
        let nfa = compile("a*");
        let closure = epsilon_closure(&nfa, &[nfa.start()]);
        assert!(closure.contains(&nfa.start()));
        assert!(closure.contains(&nfa.accept()));

        let nfa = compile("^a");
        let closure = epsilon_closure(&nfa, &[nfa.start()]);
        // anchor edges are not plain epsilons
        assert_eq!(closure, vec![nfa.start()]);
    }
}
