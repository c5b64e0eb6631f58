use crate::access::decision::{blocks, AccessDecision, Caller};
use crate::access::matcher::{match_access_rule, RuleMatchMode};
use crate::access::query::Timestamp;
use crate::access::tree::{AccessEntry, CatalogCursor, Cursor};
use crate::access::AccessPolicy;

/// Check whether `caller` may see the entry at `cursor` at instant `now`.
///
/// The path below the root is walked with an [`AccessDecision`] seeded with
/// the caller's claims. When that walk ends denied, time-scoped rules may
/// still admit the path, unless some entry on it is denied outright or is a
/// draft the caller did not author.
pub fn check<C>(
    policy: &AccessPolicy,
    cursor: &C,
    caller: &Caller,
    now: Timestamp,
    mode: RuleMatchMode,
) -> bool
where
    C: Cursor,
    C::Entry: AccessEntry,
{
    let path = cursor.path();
    let below_root = path.iter().skip(1);

    let decision = below_root
        .clone()
        .fold(AccessDecision::new(policy.claims_for(caller)), |decision, entry| {
            decision.step(*entry, caller)
        });
    if decision.is_open() {
        tracing::debug!(?caller, depth = path.len(), "admitted by claims");
        return true;
    }

    if below_root.clone().any(|entry| blocks(*entry, caller)) {
        tracing::debug!(?caller, depth = path.len(), "blocked by deny or draft");
        return false;
    }

    let granted = rules_grant(policy, cursor, now, mode);
    tracing::debug!(?caller, depth = path.len(), granted, "checked time-scoped rules");
    granted
}

fn rules_grant<C: Cursor>(
    policy: &AccessPolicy,
    cursor: &C,
    now: Timestamp,
    mode: RuleMatchMode,
) -> bool {
    policy
        .rules
        .iter()
        .any(|rule| match_access_rule(cursor, rule, now, mode))
}

/// Every catalog path `caller` may see at `now`, in depth-first order.
///
/// Each child's decision is forked from its parent's, so the claim automaton
/// is stepped once per visited entry. Subtrees behind a deny or a foreign
/// draft are skipped entirely.
pub fn visible_paths(
    policy: &AccessPolicy,
    caller: &Caller,
    now: Timestamp,
    mode: RuleMatchMode,
) -> Vec<String> {
    let mut visible = Vec::new();
    let root = policy.catalog.cursor();
    let decision = AccessDecision::new(policy.claims_for(caller));
    visit(policy, &root, &decision, caller, now, mode, &mut visible);
    visible
}

fn visit(
    policy: &AccessPolicy,
    cursor: &CatalogCursor<'_>,
    decision: &AccessDecision,
    caller: &Caller,
    now: Timestamp,
    mode: RuleMatchMode,
    visible: &mut Vec<String>,
) {
    for child in cursor.children() {
        if blocks(child.entry(), caller) {
            tracing::trace!(path = %child.link_path(), "subtree blocked");
            continue;
        }
        let next = decision.step(child.entry(), caller);
        if next.is_open() || rules_grant(policy, &child, now, mode) {
            visible.push(child.link_path());
        } else {
            tracing::trace!(path = %child.link_path(), "denied");
        }
        visit(policy, &child, &next, caller, now, mode, visible);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::loader::compile_policies;
    use crate::access::parser::parse_access_rule;
    use crate::access::tree::{Access, CatalogEntry};
    use crate::access::types::ParsedPolicy;
    use chrono::NaiveDate;

    fn at(hour: u32) -> Timestamp {
        NaiveDate::from_ymd_opt(2023, 12, 21)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn make_policy(rules: &[&str]) -> AccessPolicy {
        let parsed = ParsedPolicy {
            entries: vec![CatalogEntry::new("kurzy")
                .with_child(
                    CatalogEntry::new("daweb")
                        .with_access(Access::Claim)
                        .with_child(CatalogEntry::new("zaklady-ts").with_access(Access::Claim))
                        .with_child(CatalogEntry::new("novinky").draft_by(&["alice"])),
                )
                .with_child(CatalogEntry::new("jinykurz").with_access(Access::Claim))
                .with_child(CatalogEntry::new("archiv").with_access(Access::Deny))],
            claims: vec![("bob".into(), vec!["/kurzy/daweb/*".into(), "/kurzy/archiv".into()])],
            registered: vec!["bob".into()],
            rules: rules.iter().map(|r| parse_access_rule(r).unwrap()).collect(),
        };
        compile_policies(vec![parsed]).unwrap()
    }

    fn check_path(policy: &AccessPolicy, path: &str, login: Option<&str>, hour: u32) -> bool {
        let cursor = policy.catalog.locate(path).unwrap();
        let caller = policy.caller(login);
        check(policy, &cursor, &caller, at(hour), RuleMatchMode::Prefix)
    }

    #[test]
    fn test_root_is_always_visible() {
        let policy = make_policy(&[]);
        assert!(check_path(&policy, "/", None, 12));
    }

    #[test]
    fn test_claims_admit_subtree() {
        let policy = make_policy(&[]);
        assert!(check_path(&policy, "/kurzy/daweb", Some("bob"), 12));
        assert!(check_path(&policy, "/kurzy/daweb/zaklady-ts", Some("bob"), 12));
        assert!(!check_path(&policy, "/kurzy/jinykurz", Some("bob"), 12));
        assert!(!check_path(&policy, "/kurzy/daweb", None, 12));
    }

    #[test]
    fn test_deny_beats_claims() {
        let policy = make_policy(&["/kurzy/**"]);
        assert!(!check_path(&policy, "/kurzy/archiv", Some("bob"), 12));
    }

    #[test]
    fn test_draft_needs_author_even_with_rules() {
        let policy = make_policy(&["/kurzy/**"]);
        assert!(!check_path(&policy, "/kurzy/daweb/novinky", Some("bob"), 12));
        assert!(!check_path(&policy, "/kurzy/daweb/novinky", None, 12));
    }

    #[test]
    fn test_rules_admit_within_window() {
        let policy =
            make_policy(&["after 2023-12-21T10:00 until 2023-12-21T20:00 /kurzy/jinykurz"]);
        assert!(check_path(&policy, "/kurzy/jinykurz", None, 15));
        assert!(!check_path(&policy, "/kurzy/jinykurz", None, 9));
        assert!(!check_path(&policy, "/kurzy/jinykurz", None, 21));
    }

    #[test]
    fn test_rule_mode_controls_subtree() {
        let policy = make_policy(&["/kurzy/daweb"]);
        let cursor = policy.catalog.locate("/kurzy/daweb/zaklady-ts").unwrap();
        let caller = Caller::Anonymous;
        assert!(check(&policy, &cursor, &caller, at(12), RuleMatchMode::Prefix));
        assert!(!check(&policy, &cursor, &caller, at(12), RuleMatchMode::Exact));
    }

    #[test]
    fn test_visible_paths_for_claim_holder() {
        let policy = make_policy(&[]);
        let bob = policy.caller(Some("bob"));
        assert_eq!(
            visible_paths(&policy, &bob, at(12), RuleMatchMode::Prefix),
            vec!["/kurzy", "/kurzy/daweb", "/kurzy/daweb/zaklady-ts"]
        );
    }

    #[test]
    fn test_visible_paths_for_author() {
        let policy = make_policy(&[]);
        let alice = policy.caller(Some("alice"));
        assert_eq!(
            visible_paths(&policy, &alice, at(12), RuleMatchMode::Prefix),
            vec!["/kurzy"]
        );
    }

    #[test]
    fn test_visible_paths_agree_with_check() {
        let policy = make_policy(&["after 2023-12-21T10:00 /kurzy/jinykurz"]);
        for login in [None, Some("bob"), Some("alice")] {
            let caller = policy.caller(login);
            let visible = visible_paths(&policy, &caller, at(12), RuleMatchMode::Prefix);
            for path in [
                "/kurzy",
                "/kurzy/daweb",
                "/kurzy/daweb/zaklady-ts",
                "/kurzy/daweb/novinky",
                "/kurzy/jinykurz",
                "/kurzy/archiv",
            ] {
                let cursor = policy.catalog.locate(path).unwrap();
                assert_eq!(
                    visible.iter().any(|p| p == path),
                    check(&policy, &cursor, &caller, at(12), RuleMatchMode::Prefix),
                    "{login:?} {path}"
                );
            }
        }
    }
}
