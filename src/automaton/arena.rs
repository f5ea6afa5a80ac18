//! Arena-based state allocation for cyclic NFA structures.
//!
//! States live in one `Vec` owned by the automaton and refer to each other
//! by [`StateId`], a plain index. Quantifier loops are therefore just index
//! cycles; nothing is reference counted and the whole graph is freed when
//! the arena is dropped.
//!
//! ```text
//! a*:   entry ──ε──▶ loop ──ε──▶ exit
//!                    │  ▲
//!                    ε  ε
//!                    ▼  │
//!                    s0 ─a─▶ s1
//! ```

use smallvec::SmallVec;

use crate::regexp::{CharClass, Escape};

/// A state identifier - just an index into the arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct StateId(u32);

impl StateId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn from_index(index: usize) -> Self {
        StateId(index as u32)
    }
}

/// What a consuming transition accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Predicate {
    /// Exactly this character of a spelling.
    Char(char),
    /// Any one character of a spelling.
    Any,
    /// One spelling character inside (or outside, if negated) the class.
    Class(CharClass),
    /// One spelling character, tested against the token's literal.
    Escape(Escape),
    /// A whole token, whatever its spellings.
    AnyToken,
}

impl Predicate {
    /// Test one unit of a candidate spelling.
    ///
    /// `AnyToken` never matches here: it consumes whole tokens and is
    /// handled by the matcher at token boundaries.
    #[inline]
    pub fn matches_unit(&self, unit: char, literal: char) -> bool {
        match self {
            Predicate::Char(c) => *c == unit,
            Predicate::Any => true,
            Predicate::Class(class) => class.contains(unit),
            Predicate::Escape(escape) => escape.matches(literal),
            Predicate::AnyToken => false,
        }
    }
}

/// Zero-width assertion on the match position.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Anchor {
    /// Passable only before the first token of the text.
    Start,
    /// Passable only after the last token of the text.
    End,
}

impl Anchor {
    #[inline]
    pub fn holds(self, position: usize, len: usize) -> bool {
        match self {
            Anchor::Start => position == 0,
            Anchor::End => position == len,
        }
    }
}

/// A state in the arena-based automaton.
#[derive(Clone, Debug, Default)]
pub struct NfaState {
    /// Consuming transitions.
    pub steps: SmallVec<[(Predicate, StateId); 1]>,
    /// Epsilon transitions (taken without consuming input).
    pub epsilons: SmallVec<[StateId; 2]>,
    /// Position-guarded epsilon transitions.
    pub anchors: SmallVec<[(Anchor, StateId); 1]>,
    pub accept: bool,
}

impl NfaState {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the state has no outgoing transitions of any kind.
    pub fn is_leaf(&self) -> bool {
        self.steps.is_empty() && self.epsilons.is_empty() && self.anchors.is_empty()
    }
}

/// Arena for allocating NFA states.
///
/// States are allocated contiguously and referenced by `StateId`.
#[derive(Clone, Default)]
pub struct StateArena {
    states: Vec<NfaState>,
}

impl std::fmt::Debug for StateArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateArena")
            .field("states_count", &self.states.len())
            .finish()
    }
}

impl StateArena {
    pub fn new() -> Self {
        Self { states: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            states: Vec::with_capacity(capacity),
        }
    }

    /// Allocate a new empty state, returning its ID.
    pub fn alloc(&mut self) -> StateId {
        let id = StateId::from_index(self.states.len());
        self.states.push(NfaState::default());
        id
    }

    #[inline]
    pub fn get(&self, id: StateId) -> Option<&NfaState> {
        self.states.get(id.index())
    }

    pub fn add_step(&mut self, from: StateId, predicate: Predicate, to: StateId) {
        self[from].steps.push((predicate, to));
    }

    pub fn add_epsilon(&mut self, from: StateId, to: StateId) {
        self[from].epsilons.push(to);
    }

    pub fn add_anchor(&mut self, from: StateId, anchor: Anchor, to: StateId) {
        self[from].anchors.push((anchor, to));
    }

    /// Number of states in the arena.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateId, &NfaState)> + '_ {
        self.states
            .iter()
            .enumerate()
            .map(|(i, s)| (StateId::from_index(i), s))
    }
}

impl std::ops::Index<StateId> for StateArena {
    type Output = NfaState;

    #[inline]
    fn index(&self, id: StateId) -> &Self::Output {
        &self.states[id.index()]
    }
}

impl std::ops::IndexMut<StateId> for StateArena {
    #[inline]
    fn index_mut(&mut self, id: StateId) -> &mut Self::Output {
        &mut self.states[id.index()]
    }
}
