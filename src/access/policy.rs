use crate::access::errors::PolicyError;
use crate::access::parser::{parse_access_rule, parse_entry_query};
use crate::access::query::PropertyValue;
use crate::access::tree::{Access, CatalogEntry};
use crate::access::types::ParsedPolicy;
use kdl::{KdlDocument, KdlNode, KdlValue};

/// Parse a KDL document string into typed policy structs.
pub fn parse_kdl_document(source: &str) -> Result<ParsedPolicy, PolicyError> {
    let doc: KdlDocument = source
        .parse()
        .map_err(|e: kdl::KdlError| PolicyError::KdlParse(e.to_string()))?;

    let mut policy = ParsedPolicy::default();

    for node in doc.nodes() {
        match node.name().value() {
            "catalog" => {
                if let Some(children) = node.children() {
                    for child in children.nodes() {
                        match child.name().value() {
                            "entry" => policy.entries.push(parse_entry(child)?),
                            other => {
                                return Err(PolicyError::InvalidPolicy(format!(
                                    "unexpected child `{other}` in catalog (expected `entry`)"
                                )));
                            }
                        }
                    }
                }
            }
            "claims" => {
                let login = first_string_arg(node).ok_or_else(|| {
                    PolicyError::InvalidPolicy(
                        "claims node requires a login argument (e.g. claims \"alice\")".into(),
                    )
                })?;
                let claims = dash_list(node);
                for claim in &claims {
                    validate_claim(claim)?;
                }
                policy.claims.push((login, claims));
            }
            "registered" => {
                policy.registered.extend(dash_list(node));
            }
            "rule" => {
                let text = first_string_arg(node).ok_or_else(|| {
                    PolicyError::InvalidPolicy(
                        "rule node requires a string argument (e.g. rule \"after 2024-01-01T00:00 /kurzy/**\")"
                            .into(),
                    )
                })?;
                let rule = parse_access_rule(&text)
                    .map_err(|source| PolicyError::InvalidRule { rule: text, source })?;
                policy.rules.push(rule);
            }
            other => {
                // Ignore comments and unknown top-level nodes with a warning
                tracing::warn!("ignoring unknown top-level KDL node `{other}`");
            }
        }
    }

    Ok(policy)
}

fn parse_entry(node: &KdlNode) -> Result<CatalogEntry, PolicyError> {
    let name = first_string_arg(node).ok_or_else(|| {
        PolicyError::InvalidEntry("entry node requires a name argument (e.g. entry \"kurzy\")".into())
    })?;
    if name.is_empty() || name.contains('/') {
        return Err(PolicyError::InvalidEntry(format!(
            "entry name `{name}` must be non-empty and must not contain `/`"
        )));
    }

    let mut entry = CatalogEntry::new(&name);

    for prop in node.entries() {
        let Some(key) = prop.name() else {
            continue;
        };
        match key.value() {
            "access" => {
                let text = prop.value().as_string().ok_or_else(|| {
                    PolicyError::InvalidEntry(format!("`access` of entry `{name}` must be a string"))
                })?;
                entry.access = text
                    .parse::<Access>()
                    .map_err(|e: String| PolicyError::InvalidEntry(format!("entry `{name}`: {e}")))?;
            }
            "draft" => {
                entry.draft = prop.value().as_bool().ok_or_else(|| {
                    PolicyError::InvalidEntry(format!("`draft` of entry `{name}` must be a boolean"))
                })?;
            }
            "link" => {
                entry.link = prop
                    .value()
                    .as_string()
                    .filter(|link| !link.is_empty() && !link.contains('/'))
                    .ok_or_else(|| {
                        PolicyError::InvalidEntry(format!(
                            "`link` of entry `{name}` must be a non-empty string without `/`"
                        ))
                    })?
                    .to_string();
            }
            other => {
                entry
                    .data
                    .insert(other.to_string(), property_value(prop.value()));
            }
        }
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "entry" => {
                    let child = parse_entry(child)?;
                    if entry.child(&child.name).is_some() {
                        return Err(PolicyError::InvalidEntry(format!(
                            "duplicate entry `{}` under `{name}`",
                            child.name
                        )));
                    }
                    entry.children.push(child);
                }
                "authors" => {
                    entry.authors = dash_list(child);
                }
                other => {
                    return Err(PolicyError::InvalidEntry(format!(
                        "unexpected child `{other}` in entry `{name}` (expected `entry` or `authors`)"
                    )));
                }
            }
        }
    }

    Ok(entry)
}

/// Claims compile segment by segment on `/`, so only text that is already in
/// canonical form and carries no filters compiles the way it parses.
fn validate_claim(claim: &str) -> Result<(), PolicyError> {
    let query = parse_entry_query(claim).map_err(|source| PolicyError::InvalidRule {
        rule: claim.to_string(),
        source,
    })?;
    if query.patterns().iter().any(|pattern| pattern.filter.is_some()) {
        return Err(PolicyError::InvalidClaim {
            claim: claim.to_string(),
            reason: "property filters are not supported in claims".into(),
        });
    }
    let canonical = query.to_string();
    if canonical != claim {
        return Err(PolicyError::InvalidClaim {
            claim: claim.to_string(),
            reason: format!("write it as `{canonical}`"),
        });
    }
    Ok(())
}

fn property_value(value: &KdlValue) -> PropertyValue {
    if let Some(s) = value.as_string() {
        PropertyValue::String(s.to_string())
    } else if let Some(i) = value.as_integer() {
        PropertyValue::Number(i as f64)
    } else if let Some(f) = value.as_float() {
        PropertyValue::Number(f)
    } else if let Some(b) = value.as_bool() {
        PropertyValue::Bool(b)
    } else {
        PropertyValue::Null
    }
}

/// Extract the first string argument from a KDL node.
fn first_string_arg(node: &KdlNode) -> Option<String> {
    node.entries()
        .iter()
        .find(|e| e.name().is_none())
        .and_then(|e| e.value().as_string())
        .map(|s| s.to_string())
}

/// Extract dash-list children: nodes named "-" whose first argument is a string.
/// Example KDL:
/// ```kdl
/// claims "alice" {
///     - "/kurzy/daweb/*"
///     - "/kurzy/jinykurz/**"
/// }
/// ```
fn dash_list(node: &KdlNode) -> Vec<String> {
    let Some(children) = node.children() else {
        return Vec::new();
    };
    children
        .nodes()
        .iter()
        .filter(|n| n.name().value() == "-")
        .filter_map(first_string_arg)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::automaton::Automaton;
    use crate::access::tree::Entry;

    #[test]
    fn test_parse_catalog() {
        let kdl = r#"
catalog {
    entry "kurzy" {
        entry "daweb" access="claim" title="Web apps" lessons=12 {
            entry "zaklady-ts" access="claim" link="basics"
            entry "novinky" draft=#true {
                authors {
                    - "alice"
                }
            }
        }
        entry "archiv" access="deny"
    }
}
"#;
        let policy = parse_kdl_document(kdl).unwrap();
        assert_eq!(policy.entries.len(), 1);
        let kurzy = &policy.entries[0];
        assert_eq!(kurzy.access, Access::Public);
        assert_eq!(kurzy.children.len(), 2);

        let daweb = kurzy.child("daweb").unwrap();
        assert_eq!(daweb.access, Access::Claim);
        assert_eq!(
            daweb.property("title"),
            Some(&PropertyValue::String("Web apps".into()))
        );
        assert_eq!(daweb.property("lessons"), Some(&PropertyValue::Number(12.0)));

        let basics = daweb.child("zaklady-ts").unwrap();
        assert_eq!(basics.link, "basics");

        let draft = daweb.child("novinky").unwrap();
        assert!(draft.draft);
        assert_eq!(draft.authors, vec!["alice"]);

        assert_eq!(kurzy.child("archiv").unwrap().access, Access::Deny);
    }

    #[test]
    fn test_parse_claims_and_registered() {
        let kdl = r#"
claims "bob" {
    - "/kurzy/daweb/*"
    - "/kurzy/jinykurz/**"
}
registered {
    - "bob"
    - "carol"
}
"#;
        let policy = parse_kdl_document(kdl).unwrap();
        assert_eq!(
            policy.claims,
            vec![(
                "bob".to_string(),
                vec!["/kurzy/daweb/*".to_string(), "/kurzy/jinykurz/**".to_string()]
            )]
        );
        assert_eq!(policy.registered, vec!["bob", "carol"]);
    }

    #[test]
    fn test_parse_rules() {
        let kdl = r#"
rule "after 2023-12-21T10:00 until 2023-12-21T20:00 /kurzy/daweb/**"
rule "/kurzy/verejny"
"#;
        let policy = parse_kdl_document(kdl).unwrap();
        assert_eq!(policy.rules.len(), 2);
        assert!(policy.rules[0].after.is_some());
        assert_eq!(policy.rules[1].query.to_string(), "/kurzy/verejny");
    }

    #[test]
    fn test_invalid_rule_reports_offset() {
        let err = parse_kdl_document(r#"rule "after 2023-12-21T10:00 /kurzy?""#).unwrap_err();
        match err {
            PolicyError::InvalidRule { rule, source } => {
                assert_eq!(rule, "after 2023-12-21T10:00 /kurzy?");
                assert_eq!(source.offset, 29);
            }
            other => panic!("expected InvalidRule, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_claim() {
        let err = parse_kdl_document(r#"claims "bob" { - "kurzy" }"#).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidRule { .. }));
    }

    #[test]
    fn test_claim_with_filter_is_rejected() {
        let kdl = r#"claims "bob" { - "/kurzy[@title=\"a/b\"]/daweb" }"#;
        match parse_kdl_document(kdl).unwrap_err() {
            PolicyError::InvalidClaim { claim, reason } => {
                assert_eq!(claim, r#"/kurzy[@title="a/b"]/daweb"#);
                assert!(reason.contains("filters"));
            }
            other => panic!("expected InvalidClaim, got {other:?}"),
        }
    }

    #[test]
    fn test_claim_with_inner_whitespace_is_rejected() {
        let kdl = r#"claims "bob" { - "/ kurzy /daweb" }"#;
        match parse_kdl_document(kdl).unwrap_err() {
            PolicyError::InvalidClaim { claim, reason } => {
                assert_eq!(claim, "/ kurzy /daweb");
                assert!(reason.contains("`/kurzy/daweb`"));
            }
            other => panic!("expected InvalidClaim, got {other:?}"),
        }
    }

    #[test]
    fn test_accepted_claims_compile_as_written() {
        let policy = parse_kdl_document(
            r#"claims "bob" { - "/kurzy/daweb/*"; - "/kurzy/lekce-*/**" }"#,
        )
        .unwrap();
        let automaton = Automaton::build(&policy.claims[0].1);
        let kurzy = automaton.step("kurzy");
        assert!(kurzy.step("daweb").step("zaklady-ts").accepts());
        assert!(kurzy.step("lekce-1").step("a").step("b").accepts());
        assert!(!kurzy.step("jinykurz").accepts());
    }

    #[test]
    fn test_invalid_access_level() {
        let kdl = r#"catalog { entry "kurzy" access="private" }"#;
        let err = parse_kdl_document(kdl).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidEntry(_)));
    }

    #[test]
    fn test_duplicate_entry() {
        let kdl = r#"catalog { entry "kurzy" { entry "a"; entry "a" } }"#;
        let err = parse_kdl_document(kdl).unwrap_err();
        assert!(matches!(err, PolicyError::InvalidEntry(_)));
    }

    #[test]
    fn test_entry_name_with_slash() {
        let kdl = r#"catalog { entry "a/b" }"#;
        assert!(matches!(
            parse_kdl_document(kdl).unwrap_err(),
            PolicyError::InvalidEntry(_)
        ));
    }

    #[test]
    fn test_unknown_top_level_node_is_ignored() {
        let policy = parse_kdl_document(r#"comment "hello""#).unwrap();
        assert!(policy.entries.is_empty());
        assert!(policy.rules.is_empty());
    }

    #[test]
    fn test_kdl_syntax_error() {
        let err = parse_kdl_document("catalog {").unwrap_err();
        assert!(matches!(err, PolicyError::KdlParse(_)));
    }
}
