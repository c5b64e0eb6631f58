pub mod automaton;
pub mod decision;
pub mod engine;
pub mod errors;
pub mod glob;
pub mod loader;
pub mod matcher;
pub mod parser;
pub mod policy;
pub mod query;
pub mod scan;
pub mod tree;
pub mod types;

use std::collections::{HashMap, HashSet};

use automaton::Automaton;
use decision::Caller;
use query::AccessRule;
use tree::Catalog;

/// Fully compiled access state, loaded from KDL policy files.
/// Immutable after construction; configuration changes require a reload.
#[derive(Debug, Default)]
pub struct AccessPolicy {
    pub catalog: Catalog,
    /// login -> claim strings, in file order
    pub claims: HashMap<String, Vec<String>>,
    /// login -> claim automaton compiled from `claims`
    pub automata: HashMap<String, Automaton>,
    /// Logins that count as registered callers
    pub registered: HashSet<String>,
    /// Time-scoped rules consulted when claims do not admit a path
    pub rules: Vec<AccessRule>,
}

impl AccessPolicy {
    /// Resolve a login into a caller, registered or not.
    pub fn caller(&self, login: Option<&str>) -> Caller {
        match login {
            None => Caller::Anonymous,
            Some(login) if self.registered.contains(login) => Caller::Registered(login.to_string()),
            Some(login) => Caller::Public(login.to_string()),
        }
    }

    /// The caller's claim automaton, positioned at the root. Callers without
    /// claims get the rejecting automaton.
    pub fn claims_for(&self, caller: &Caller) -> Automaton {
        caller
            .login()
            .and_then(|login| self.automata.get(login))
            .cloned()
            .unwrap_or_else(Automaton::reject_all)
    }
}
