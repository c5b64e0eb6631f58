use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// Failure value of the rule/query parser: the message and byte offset of the
/// first character that could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("{message} at offset {offset}")]
#[diagnostic(
    code(catalog_access::parse),
    help("Patterns look like `/name[@prop op value]`; rules may start with `after YYYY-MM-DDTHH:mm` and/or `until YYYY-MM-DDTHH:mm`")
)]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
    #[source_code]
    input: String,
    #[label("here")]
    span: SourceSpan,
}

impl ParseError {
    pub fn new(input: &str, message: impl Into<String>, offset: usize) -> Self {
        let offset = offset.min(input.len());
        let width = input
            .get(offset..)
            .and_then(|rest| rest.chars().next())
            .map_or(0, char::len_utf8);
        Self {
            message: message.into(),
            offset,
            input: input.to_string(),
            span: (offset, width).into(),
        }
    }

    /// The text that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }
}

#[derive(Debug, Error, Diagnostic)]
pub enum PolicyError {
    #[error("Failed to load policy file `{path}`")]
    #[diagnostic(
        code(catalog_access::policy_load),
        help("Check that the file exists and contains valid KDL syntax")
    )]
    PolicyLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("KDL parse error: {0}")]
    #[diagnostic(
        code(catalog_access::kdl_parse),
        help("Check your KDL file syntax, see https://kdl.dev for the specification")
    )]
    KdlParse(String),

    #[error("Invalid policy: {0}")]
    #[diagnostic(
        code(catalog_access::invalid_policy),
        help("Each policy file may contain `catalog`, `claims`, `registered` and `rule` KDL nodes")
    )]
    InvalidPolicy(String),

    #[error("Invalid catalog entry: {0}")]
    #[diagnostic(
        code(catalog_access::invalid_entry),
        help("Entry syntax: entry \"name\" access=\"public|logged-in|claim|deny\" draft=#true {{ authors {{ - \"login\" }} }}")
    )]
    InvalidEntry(String),

    #[error("Invalid access rule `{rule}`")]
    #[diagnostic(code(catalog_access::invalid_rule))]
    InvalidRule {
        rule: String,
        #[source]
        #[diagnostic_source]
        source: ParseError,
    },

    #[error("Invalid claim `{claim}`: {reason}")]
    #[diagnostic(
        code(catalog_access::invalid_claim),
        help("Claims are plain entry paths such as `/kurzy/daweb/*`, without filters or inner whitespace")
    )]
    InvalidClaim { claim: String, reason: String },

    #[error("I/O error: {0}")]
    #[diagnostic(code(catalog_access::io))]
    Io(#[from] std::io::Error),
}
