use serde::Serialize;

use crate::access::query::AccessRule;
use crate::access::tree::CatalogEntry;

/// Intermediate result from parsing a single KDL policy file.
#[derive(Debug, Clone, Default)]
pub struct ParsedPolicy {
    /// Top-level catalog entries (children of the root).
    pub entries: Vec<CatalogEntry>,
    /// (login, claim strings)
    pub claims: Vec<(String, Vec<String>)>,
    /// Logins that count as registered callers
    pub registered: Vec<String>,
    pub rules: Vec<AccessRule>,
}

// ---------- CLI output types ----------

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    /// e.g. "/kurzy/daweb"
    pub path: String,
    pub allowed: bool,
}

#[derive(Debug, Serialize)]
pub struct ParseResponse<T: Serialize> {
    /// Canonical text form of the parsed value
    pub canonical: String,
    pub parsed: T,
}
