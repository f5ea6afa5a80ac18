//! Thompson construction from a parsed [`Node`] tree.
//!
//! Every node becomes a fragment with one entry and one exit state; parents
//! wire fragments together with epsilon transitions. Literal runs are split
//! into one transition per character so a token's spelling can end anywhere
//! inside a run.
//!
//! Bounded repeats are unrolled: `a{2,4}` is two mandatory copies of `a`
//! followed by two copies that can each be skipped to the exit. Unbounded
//! repeats append one Kleene loop after the mandatory copies.

use crate::automaton::{Anchor, Anchoring, Predicate, StateArena, StateId};
use crate::error::CompilationError;

use super::parser::{EscapeKind, Node, NEST_LIMIT, REPEAT_MAX};

/// Default ceiling on automaton size.
pub const MAX_STATES: usize = 1 << 18;

/// Deepest tree `compile_ast` accepts, counting every node on the path.
///
/// Parsed patterns stay well below this: each group adds at most a
/// group, an alternation and a sequence level.
pub const MAX_TREE_DEPTH: usize = 4 * NEST_LIMIT;

/// A compiled pattern automaton.
///
/// Immutable once built; share it freely between threads.
#[derive(Clone, Debug)]
pub struct Nfa {
    arena: StateArena,
    start: StateId,
    accept: StateId,
    anchoring: Anchoring,
}

impl Nfa {
    #[inline]
    pub fn start(&self) -> StateId {
        self.start
    }

    #[inline]
    pub fn accept(&self) -> StateId {
        self.accept
    }

    #[inline]
    pub fn arena(&self) -> &StateArena {
        &self.arena
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Anchoring implied by the pattern itself.
    pub fn anchoring(&self) -> Anchoring {
        self.anchoring
    }

    #[inline]
    pub fn is_accept(&self, id: StateId) -> bool {
        self.arena[id].accept
    }
}

/// A partially built automaton piece.
#[derive(Clone, Copy, Debug)]
struct Fragment {
    entry: StateId,
    exit: StateId,
}

struct Builder {
    arena: StateArena,
    limit: usize,
}

impl Builder {
    fn alloc(&mut self) -> Result<StateId, CompilationError> {
        if self.arena.len() >= self.limit {
            return Err(CompilationError::TooManyStates { limit: self.limit });
        }
        Ok(self.arena.alloc())
    }

    /// entry --ε--> exit
    fn empty_fragment(&mut self) -> Result<Fragment, CompilationError> {
        let entry = self.alloc()?;
        let exit = self.alloc()?;
        self.arena.add_epsilon(entry, exit);
        Ok(Fragment { entry, exit })
    }

    fn step_fragment(&mut self, predicate: Predicate) -> Result<Fragment, CompilationError> {
        let entry = self.alloc()?;
        let exit = self.alloc()?;
        self.arena.add_step(entry, predicate, exit);
        Ok(Fragment { entry, exit })
    }

    fn build(&mut self, node: &Node) -> Result<Fragment, CompilationError> {
        match node {
            Node::Literal(text) => self.build_literal(text),
            Node::AnyChar => self.step_fragment(Predicate::Any),
            Node::CharClass(class) => self.step_fragment(Predicate::Class(class.clone())),
            Node::Escape(escape) => match escape.kind {
                EscapeKind::AnyToken => self.step_fragment(Predicate::AnyToken),
                _ => self.step_fragment(Predicate::Escape(*escape)),
            },
            Node::Concat(children) => self.build_concat(children),
            Node::Alternation(branches) => self.build_alternation(branches),
            Node::Group(inner) => self.build(inner),
            Node::Repeat { node, min, max } => self.build_repeat(node, *min, *max),
            Node::StartAnchor => self.build_anchor(Anchor::Start),
            Node::EndAnchor => self.build_anchor(Anchor::End),
        }
    }

    fn build_literal(&mut self, text: &str) -> Result<Fragment, CompilationError> {
        if text.is_empty() {
            return self.empty_fragment();
        }
        let entry = self.alloc()?;
        let mut current = entry;
        for c in text.chars() {
            let next = self.alloc()?;
            self.arena.add_step(current, Predicate::Char(c), next);
            current = next;
        }
        Ok(Fragment {
            entry,
            exit: current,
        })
    }

    fn build_concat(&mut self, children: &[Node]) -> Result<Fragment, CompilationError> {
        let Some((first, rest)) = children.split_first() else {
            return self.empty_fragment();
        };
        let head = self.build(first)?;
        let mut exit = head.exit;
        for child in rest {
            let frag = self.build(child)?;
            self.arena.add_epsilon(exit, frag.entry);
            exit = frag.exit;
        }
        Ok(Fragment {
            entry: head.entry,
            exit,
        })
    }

    fn build_alternation(&mut self, branches: &[Node]) -> Result<Fragment, CompilationError> {
        let entry = self.alloc()?;
        let exit = self.alloc()?;
        for branch in branches {
            let frag = self.build(branch)?;
            self.arena.add_epsilon(entry, frag.entry);
            self.arena.add_epsilon(frag.exit, exit);
        }
        Ok(Fragment { entry, exit })
    }

    fn build_repeat(
        &mut self,
        node: &Node,
        min: u32,
        max: Option<u32>,
    ) -> Result<Fragment, CompilationError> {
        for bound in std::iter::once(min).chain(max) {
            if bound > REPEAT_MAX {
                return Err(CompilationError::RepeatTooLarge {
                    bound,
                    limit: REPEAT_MAX,
                });
            }
        }
        if let Some(max) = max {
            if min > max {
                return Err(CompilationError::InvertedRepeat { min, max });
            }
            if max == 0 {
                return self.empty_fragment();
            }
        }

        let entry = self.alloc()?;
        let mut current = entry;
        for _ in 0..min {
            let frag = self.build(node)?;
            self.arena.add_epsilon(current, frag.entry);
            current = frag.exit;
        }

        let exit = self.alloc()?;
        match max {
            Some(max) => {
                for _ in min..max {
                    let frag = self.build(node)?;
                    self.arena.add_epsilon(current, frag.entry);
                    self.arena.add_epsilon(current, exit);
                    current = frag.exit;
                }
                self.arena.add_epsilon(current, exit);
            }
            None => {
                let loop_state = self.alloc()?;
                let frag = self.build(node)?;
                self.arena.add_epsilon(current, loop_state);
                self.arena.add_epsilon(loop_state, frag.entry);
                self.arena.add_epsilon(frag.exit, loop_state);
                self.arena.add_epsilon(loop_state, exit);
            }
        }
        Ok(Fragment { entry, exit })
    }

    fn build_anchor(&mut self, anchor: Anchor) -> Result<Fragment, CompilationError> {
        let entry = self.alloc()?;
        let exit = self.alloc()?;
        self.arena.add_anchor(entry, anchor, exit);
        Ok(Fragment { entry, exit })
    }
}

/// Reject trees deep enough to exhaust the stack in the recursive passes.
///
/// Walks with an explicit stack so the check itself cannot overflow.
fn check_depth(root: &Node) -> Result<(), CompilationError> {
    let mut stack = vec![(root, 1usize)];
    while let Some((node, depth)) = stack.pop() {
        if depth > MAX_TREE_DEPTH {
            return Err(CompilationError::TooDeep {
                limit: MAX_TREE_DEPTH,
            });
        }
        match node {
            Node::Concat(children) | Node::Alternation(children) => {
                stack.extend(children.iter().map(|child| (child, depth + 1)));
            }
            Node::Group(inner) => stack.push((inner.as_ref(), depth + 1)),
            Node::Repeat { node, .. } => stack.push((node.as_ref(), depth + 1)),
            Node::Literal(_)
            | Node::AnyChar
            | Node::CharClass(_)
            | Node::Escape(_)
            | Node::StartAnchor
            | Node::EndAnchor => {}
        }
    }
    Ok(())
}

fn contains_anchor(node: &Node) -> bool {
    match node {
        Node::StartAnchor | Node::EndAnchor => true,
        Node::Concat(children) | Node::Alternation(children) => {
            children.iter().any(contains_anchor)
        }
        Node::Group(inner) => contains_anchor(inner),
        Node::Repeat { node, .. } => contains_anchor(node),
        Node::Literal(_) | Node::AnyChar | Node::CharClass(_) | Node::Escape(_) => false,
    }
}

/// Anchors may only open or close a top-level branch.
fn check_anchor_placement(root: &Node) -> Result<(), CompilationError> {
    for branch in root.branches() {
        let inner: &[Node] = match branch {
            Node::StartAnchor | Node::EndAnchor => &[],
            Node::Concat(items) => {
                let mut items = items.as_slice();
                if let [Node::StartAnchor, rest @ ..] = items {
                    items = rest;
                }
                if let [rest @ .., Node::EndAnchor] = items {
                    items = rest;
                }
                items
            }
            other => std::slice::from_ref(other),
        };
        if inner.iter().any(contains_anchor) {
            return Err(CompilationError::MisplacedAnchor);
        }
    }
    Ok(())
}

fn branch_edges(branch: &Node) -> (bool, bool) {
    match branch {
        Node::StartAnchor => (true, false),
        Node::EndAnchor => (false, true),
        Node::Concat(items) => (
            matches!(items.first(), Some(Node::StartAnchor)),
            matches!(items.last(), Some(Node::EndAnchor)),
        ),
        _ => (false, false),
    }
}

/// Anchoring shared by every top-level branch.
fn pattern_anchoring(root: &Node) -> Anchoring {
    let (start, end) = root
        .branches()
        .iter()
        .map(branch_edges)
        .fold((true, true), |(s, e), (bs, be)| (s && bs, e && be));
    Anchoring::from_flags(start, end)
}

/// Compile a tree into an automaton.
pub fn compile_ast(root: &Node) -> Result<Nfa, CompilationError> {
    compile_ast_with_limit(root, MAX_STATES)
}

/// Compile a tree, failing once more than `limit` states are needed.
pub fn compile_ast_with_limit(root: &Node, limit: usize) -> Result<Nfa, CompilationError> {
    check_depth(root)?;
    check_anchor_placement(root)?;

    let mut builder = Builder {
        arena: StateArena::with_capacity(16),
        limit,
    };
    let frag = builder.build(root)?;
    builder.arena[frag.exit].accept = true;

    let nfa = Nfa {
        arena: builder.arena,
        start: frag.entry,
        accept: frag.exit,
        anchoring: pattern_anchoring(root),
    };
    tracing::debug!(
        states = nfa.len(),
        anchoring = ?nfa.anchoring,
        "compiled automaton"
    );
    Ok(nfa)
}
