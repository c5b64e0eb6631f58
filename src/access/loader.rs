use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::access::automaton::Automaton;
use crate::access::errors::PolicyError;
use crate::access::policy::parse_kdl_document;
use crate::access::query::AccessRule;
use crate::access::tree::{Catalog, CatalogEntry};
use crate::access::types::ParsedPolicy;
use crate::access::AccessPolicy;

/// Load all `.kdl` policy files from the given directory and compile them
/// into a single immutable `AccessPolicy`.
pub fn load_policies(dir: &Path) -> Result<AccessPolicy, PolicyError> {
    if !dir.is_dir() {
        return Err(PolicyError::InvalidPolicy(format!(
            "policies directory `{}` does not exist or is not a directory",
            dir.display()
        )));
    }

    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .filter(|e| {
            e.path()
                .extension()
                .map(|ext| ext == "kdl")
                .unwrap_or(false)
        })
        .collect();
    entries.sort_by_key(|e| e.path());

    let mut all_parsed = Vec::with_capacity(entries.len());
    for entry in &entries {
        let path = entry.path();
        let contents =
            std::fs::read_to_string(&path).map_err(|source| PolicyError::PolicyLoad {
                path: path.display().to_string(),
                source,
            })?;
        all_parsed.push(parse_kdl_document(&contents)?);
    }

    let policy = compile_policies(all_parsed)?;

    tracing::info!(
        files = entries.len(),
        entries = policy.catalog.len(),
        claim_sets = policy.claims.len(),
        registered = policy.registered.len(),
        rules = policy.rules.len(),
        "Loaded access policies"
    );

    Ok(policy)
}

/// Merge and compile all parsed policies into a single `AccessPolicy`.
pub fn compile_policies(parsed: Vec<ParsedPolicy>) -> Result<AccessPolicy, PolicyError> {
    let mut top_level: Vec<CatalogEntry> = Vec::new();
    let mut claims: HashMap<String, Vec<String>> = HashMap::new();
    let mut registered: HashSet<String> = HashSet::new();
    let mut rules: Vec<AccessRule> = Vec::new();

    for p in parsed {
        for entry in p.entries {
            if top_level.iter().any(|e| e.name == entry.name) {
                return Err(PolicyError::InvalidEntry(format!(
                    "top-level entry `{}` is defined more than once",
                    entry.name
                )));
            }
            top_level.push(entry);
        }
        for (login, list) in p.claims {
            claims.entry(login).or_default().extend(list);
        }
        registered.extend(p.registered);
        rules.extend(p.rules);
    }

    let automata = claims
        .iter()
        .map(|(login, list)| (login.clone(), Automaton::build(list)))
        .collect();

    Ok(AccessPolicy {
        catalog: Catalog::new(top_level),
        claims,
        automata,
        registered,
        rules,
    })
}
