//! Claim automaton: a set of claim strings compiled into one shared
//! non-deterministic state graph, simulated segment by segment.
//!
//! Claims sharing a prefix share states, so the graph is a trie. A `**`
//! segment becomes a self-loop on the current state that matches any
//! segment, and ends compilation of that claim. Stepping never mutates: each
//! [`Automaton::step`] returns a new value holding the next live-state set,
//! and the state graph itself is shared behind an [`Arc`].

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::access::glob::Glob;
use crate::access::query::NamePattern;

#[derive(Debug, Clone)]
struct Transition {
    pattern: NamePattern,
    matcher: Glob,
    target: usize,
}

#[derive(Debug, Clone, Default)]
struct State {
    transitions: Vec<Transition>,
}

/// Compiled claim states, shared by every automaton stepped from one build.
#[derive(Debug)]
pub struct ClaimGraph {
    states: Vec<State>,
}

impl ClaimGraph {
    fn build<S: AsRef<str>>(claims: &[S]) -> Self {
        let mut states = vec![State::default()];

        for claim in claims {
            let mut current = 0;
            for segment in claim.as_ref().split('/').filter(|s| !s.is_empty()) {
                let pattern = NamePattern::parse(segment);

                if pattern == NamePattern::AnySequence {
                    let transitions = &mut states[current].transitions;
                    if !transitions.iter().any(|t| t.pattern == pattern) {
                        transitions.push(Transition {
                            pattern,
                            matcher: Glob::Any,
                            target: current,
                        });
                    }
                    break;
                }

                let existing = states[current]
                    .transitions
                    .iter()
                    .find(|t| t.pattern == pattern)
                    .map(|t| t.target);
                current = match existing {
                    Some(target) => target,
                    None => {
                        let target = states.len();
                        states.push(State::default());
                        states[current].transitions.push(Transition {
                            matcher: pattern.compile(),
                            pattern,
                            target,
                        });
                        target
                    }
                };
            }
        }

        Self { states }
    }
}

#[derive(Debug, Clone)]
pub enum Automaton {
    Running {
        graph: Arc<ClaimGraph>,
        /// Never empty: an empty set collapses into `RejectAll`.
        current: BTreeSet<usize>,
    },
    /// No claim matches the path walked so far; stepping is the identity.
    RejectAll,
}

impl Automaton {
    /// Compile `claims` into an automaton positioned before the first segment.
    pub fn build<S: AsRef<str>>(claims: &[S]) -> Self {
        Automaton::Running {
            graph: Arc::new(ClaimGraph::build(claims)),
            current: BTreeSet::from([0]),
        }
    }

    pub fn reject_all() -> Self {
        Automaton::RejectAll
    }

    /// Follow every transition out of every live state whose glob matches
    /// `segment`.
    pub fn step(&self, segment: &str) -> Self {
        let Automaton::Running { graph, current } = self else {
            return Automaton::RejectAll;
        };
        let next: BTreeSet<usize> = current
            .iter()
            .flat_map(|&state| graph.states[state].transitions.iter())
            .filter(|t| t.matcher.is_match(segment))
            .map(|t| t.target)
            .collect();
        if next.is_empty() {
            return Automaton::RejectAll;
        }
        Automaton::Running {
            graph: Arc::clone(graph),
            current: next,
        }
    }

    /// Whether some claim still matches the path walked so far.
    pub fn accepts(&self) -> bool {
        matches!(self, Automaton::Running { .. })
    }

    /// Live state indices, ascending.
    pub fn live_states(&self) -> Vec<usize> {
        match self {
            Automaton::Running { current, .. } => current.iter().copied().collect(),
            Automaton::RejectAll => Vec::new(),
        }
    }

    /// Number of states in the compiled graph; zero for `RejectAll`.
    pub fn state_count(&self) -> usize {
        match self {
            Automaton::Running { graph, .. } => graph.states.len(),
            Automaton::RejectAll => 0,
        }
    }
}
