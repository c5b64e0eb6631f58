//! Catalog Access - access control for tree-structured course catalogs
//!
//! This library provides the rule/query language, the claim automaton and the
//! per-path access decisions, plus the KDL policy loader used by the CLI.
//! It exposes all modules for testing purposes.

pub mod access;
pub mod settings;
