use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::access::glob::Glob;

/// Fixed-format instant used by access rules: `YYYY-MM-DDTHH:mm`, no seconds
/// and no offset.
pub type Timestamp = NaiveDateTime;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Operand of a property filter and the value type of entry data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => {
                // JSON escaping is exactly what the parser decodes
                let quoted = serde_json::to_string(s).map_err(|_| fmt::Error)?;
                f.write_str(&quoted)
            }
            PropertyValue::Number(n) => write!(f, "{n}"),
            PropertyValue::Bool(b) => write!(f, "{b}"),
            PropertyValue::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "*=")]
    Contains,
    #[serde(rename = "^=")]
    StartsWith,
    #[serde(rename = "$=")]
    EndsWith,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
}

impl Operator {
    /// Maps an operator token to its operator; `==` is an alias of `=`.
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "=" | "==" => Operator::Eq,
            "!=" => Operator::Ne,
            "*=" => Operator::Contains,
            "^=" => Operator::StartsWith,
            "$=" => Operator::EndsWith,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Contains => "*=",
            Operator::StartsWith => "^=",
            Operator::EndsWith => "$=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub name: String,
    pub op: Operator,
    pub value: PropertyValue,
}

impl fmt::Display for PropertyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[@{}{}{}]", self.name, self.op, self.value)
    }
}

/// Name-matching unit of an entry pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamePattern {
    Literal(String),
    /// A name containing `*`, e.g. `lekce-*`, compiled once at parse time.
    Glob { text: String, glob: Glob },
    /// `*`: exactly one segment with any name.
    AnySegment,
    /// `**`: any number of further segments.
    AnySequence,
}

impl NamePattern {
    pub fn parse(text: &str) -> Self {
        match text {
            "*" => NamePattern::AnySegment,
            "**" => NamePattern::AnySequence,
            t if t.contains('*') => NamePattern::Glob {
                text: t.to_string(),
                glob: Glob::compile(t),
            },
            t => NamePattern::Literal(t.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            NamePattern::Literal(s) | NamePattern::Glob { text: s, .. } => s,
            NamePattern::AnySegment => "*",
            NamePattern::AnySequence => "**",
        }
    }

    pub fn compile(&self) -> Glob {
        match self {
            NamePattern::Literal(s) => Glob::Literal(s.clone()),
            NamePattern::Glob { glob, .. } => glob.clone(),
            NamePattern::AnySegment | NamePattern::AnySequence => Glob::Any,
        }
    }

    /// Single-segment match: `*` and `**` accept any one name.
    pub fn matches(&self, name: &str) -> bool {
        match self {
            NamePattern::Literal(s) => s == name,
            NamePattern::Glob { glob, .. } => glob.is_match(name),
            NamePattern::AnySegment | NamePattern::AnySequence => true,
        }
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for NamePattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NamePattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(NamePattern::parse(&text))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPattern {
    pub name: NamePattern,
    pub filter: Option<PropertyFilter>,
}

impl EntryPattern {
    /// The implicit pattern matching the unnamed root entry.
    pub fn root() -> Self {
        Self {
            name: NamePattern::Literal(String::new()),
            filter: None,
        }
    }
}

impl fmt::Display for EntryPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.name)?;
        if let Some(filter) = &self.filter {
            write!(f, "{filter}")?;
        }
        Ok(())
    }
}

/// Ordered entry patterns, matched left to right from the root's children.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryQuery(pub Vec<EntryPattern>);

impl EntryQuery {
    pub fn patterns(&self) -> &[EntryPattern] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for EntryQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pattern in &self.0 {
            write!(f, "{pattern}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessRule {
    pub query: EntryQuery,
    pub after: Option<Timestamp>,
    pub until: Option<Timestamp>,
}

impl AccessRule {
    /// Whether `now` lies within `[after, until]`; a missing bound is open.
    pub fn in_force(&self, now: Timestamp) -> bool {
        self.after.map_or(true, |after| now >= after) && self.until.map_or(true, |until| now <= until)
    }
}

impl fmt::Display for AccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut words = Vec::new();
        if let Some(after) = self.after {
            words.push(format!("after {}", after.format(TIMESTAMP_FORMAT)));
        }
        if let Some(until) = self.until {
            words.push(format!("until {}", until.format(TIMESTAMP_FORMAT)));
        }
        if !self.query.is_empty() {
            words.push(self.query.to_string());
        }
        f.write_str(&words.join(" "))
    }
}
