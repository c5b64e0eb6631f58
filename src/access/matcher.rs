use serde::{Deserialize, Serialize};

use crate::access::query::{
    AccessRule, EntryPattern, EntryQuery, NamePattern, Operator, PropertyFilter, PropertyValue,
    Timestamp,
};
use crate::access::tree::{Cursor, Entry};

/// What happens when a rule's patterns run out before the cursor path does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleMatchMode {
    /// The rule matches the path prefix, and so the whole subtree below it.
    #[default]
    Prefix,
    /// Every path entry must be consumed by a pattern.
    Exact,
}

/// Match one entry against one pattern: name first, then the optional filter.
pub fn match_entry<E: Entry + ?Sized>(entry: &E, pattern: &EntryPattern) -> bool {
    if !pattern.name.matches(entry.name()) {
        return false;
    }
    match &pattern.filter {
        None => true,
        Some(filter) => match_filter(entry.property(&filter.name), filter),
    }
}

/// Absent properties and mismatched operand types never match.
fn match_filter(actual: Option<&PropertyValue>, filter: &PropertyFilter) -> bool {
    use PropertyValue::{Number, String};

    let Some(actual) = actual else {
        return false;
    };
    match (filter.op, actual, &filter.value) {
        (Operator::Eq, a, b) => a == b,
        (Operator::Ne, a, b) => a != b,
        (Operator::Contains, String(a), String(b)) => a.contains(b.as_str()),
        (Operator::StartsWith, String(a), String(b)) => a.starts_with(b.as_str()),
        (Operator::EndsWith, String(a), String(b)) => a.ends_with(b.as_str()),
        (Operator::Lt, Number(a), Number(b)) => a < b,
        (Operator::Le, Number(a), Number(b)) => a <= b,
        (Operator::Gt, Number(a), Number(b)) => a > b,
        (Operator::Ge, Number(a), Number(b)) => a >= b,
        _ => false,
    }
}

/// Match the cursor's root-inclusive path against `query`.
pub fn match_entry_query<C: Cursor>(cursor: &C, query: &EntryQuery, mode: RuleMatchMode) -> bool {
    walk(&cursor.path(), query, mode)
}

/// Match the cursor against a rule that is in force at `now`.
pub fn match_access_rule<C: Cursor>(
    cursor: &C,
    rule: &AccessRule,
    now: Timestamp,
    mode: RuleMatchMode,
) -> bool {
    if !rule.in_force(now) {
        return false;
    }
    walk(&cursor.path(), &rule.query, mode)
}

/// Lockstep walk of path entries and patterns, prefixed by the implicit root
/// pattern. A `**` pattern never advances: it keeps consuming entries.
fn walk<E: Entry + ?Sized>(path: &[&E], query: &EntryQuery, mode: RuleMatchMode) -> bool {
    let root = EntryPattern::root();
    let patterns: Vec<&EntryPattern> = std::iter::once(&root).chain(query.patterns()).collect();

    let mut index = 0;
    for entry in path {
        let Some(pattern) = patterns.get(index) else {
            return mode == RuleMatchMode::Prefix;
        };
        if !match_entry(*entry, pattern) {
            return false;
        }
        if pattern.name != NamePattern::AnySequence {
            index += 1;
        }
    }
    patterns[index..]
        .iter()
        .all(|p| p.name == NamePattern::AnySequence)
}
