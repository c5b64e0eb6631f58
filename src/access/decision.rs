use crate::access::automaton::Automaton;
use crate::access::tree::{Access, AccessEntry};

/// Who is asking. How identity and registration are established is up to the
/// caller of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    /// Known login without a registration.
    Public(String),
    Registered(String),
}

impl Caller {
    pub fn login(&self) -> Option<&str> {
        match self {
            Caller::Anonymous => None,
            Caller::Public(login) | Caller::Registered(login) => Some(login),
        }
    }

    pub fn is_registered(&self) -> bool {
        matches!(self, Caller::Registered(_))
    }

    pub fn is_author_of<E: AccessEntry + ?Sized>(&self, entry: &E) -> bool {
        self.login()
            .is_some_and(|login| entry.authors().iter().any(|author| author == login))
    }
}

/// Whether `entry` closes its whole subtree to `caller` regardless of claims
/// or rules: an explicit deny, or a draft the caller did not author.
pub fn blocks<E: AccessEntry + ?Sized>(entry: &E, caller: &Caller) -> bool {
    entry.access() == Access::Deny || (entry.is_draft() && !caller.is_author_of(entry))
}

/// Per-path access state, advanced one entry at a time while descending.
#[derive(Debug, Clone)]
pub enum AccessDecision {
    /// Claims are still viable; holds the automaton stepped so far.
    Open(Automaton),
    /// Terminal for the whole subtree.
    Denied,
}

impl AccessDecision {
    pub fn new(claims: Automaton) -> Self {
        AccessDecision::Open(claims)
    }

    /// Decision for the child `entry` given this (parent) decision.
    pub fn step<E: AccessEntry + ?Sized>(&self, entry: &E, caller: &Caller) -> Self {
        let AccessDecision::Open(automaton) = self else {
            return AccessDecision::Denied;
        };
        if entry.access() == Access::Deny {
            return AccessDecision::Denied;
        }
        let advanced = automaton.step(entry.link());
        if entry.is_draft() {
            return if caller.is_author_of(entry) {
                AccessDecision::Open(advanced)
            } else {
                AccessDecision::Denied
            };
        }
        match entry.access() {
            Access::Public => AccessDecision::Open(advanced),
            Access::LoggedIn if caller.is_registered() => AccessDecision::Open(advanced),
            _ if advanced.accepts() => AccessDecision::Open(advanced),
            _ => AccessDecision::Denied,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, AccessDecision::Open(_))
    }
}
