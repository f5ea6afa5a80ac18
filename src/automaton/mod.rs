//! Automaton storage and token-level simulation.
//!
//! - `arena`: states, transitions and the [`StateArena`] they live in
//! - `state_set`: sparse set used for frontiers and closures
//! - `frontier`: the matcher that advances over whole tokens

mod arena;
mod frontier;
mod state_set;

pub use arena::{Anchor, NfaState, Predicate, StateArena, StateId};
pub use frontier::{
    epsilon_closure, run, Anchoring, CandidateMode, FrontierMatcher, Match, MatchEvent,
    MatchObserver, StepCounter,
};
pub use state_set::StateSet;
