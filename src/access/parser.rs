//! Recursive-descent parser for entry queries and access rules.
//!
//! ```text
//! accessRule     := [ timeLimits ] { entryPattern }
//! timeLimits     := ("after" datetime ["until" datetime]) | ("until" datetime)
//! entryQuery     := { entryPattern }
//! entryPattern   := "/" wsp entryName wsp [ propertyFilter ]
//! entryName      := "**" | "*" | identifier
//! propertyFilter := "[" wsp "@" identifier wsp operator wsp value wsp "]"
//! operator       := "!=" | "*=" | "^=" | "$=" | "==" | "<=" | ">=" | "<" | ">" | "="
//! value          := string | boolean | "null" | number
//! ```
//!
//! Every production takes a [`ScanCursor`] by value and returns the parsed
//! value with the advanced cursor, or the message and offset of the first
//! character it could not consume.

use std::sync::LazyLock;

use chrono::NaiveDateTime;
use regex::Regex;

use crate::access::errors::ParseError;
use crate::access::query::{
    AccessRule, EntryPattern, EntryQuery, NamePattern, Operator, PropertyFilter, PropertyValue,
    Timestamp, TIMESTAMP_FORMAT,
};
use crate::access::scan::ScanCursor;

static ENTRY_NAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\w.*-]+").unwrap());
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z_][\w-]*").unwrap());
static STRING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^"(?:[^"\\]|\\.)*""#).unwrap());
static BOOLEAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:true|false)\b").unwrap());
static NULL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^null\b").unwrap());
static NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?\d+(?:\.\d+)?").unwrap());
static DATETIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}").unwrap());

const OPERATORS: &[&str] = &["!=", "*=", "^=", "$=", "==", "<=", ">=", "<", ">", "="];

#[derive(Debug)]
struct Failure {
    message: String,
    offset: usize,
}

impl Failure {
    fn at(cursor: ScanCursor<'_>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: cursor.offset(),
        }
    }

    fn into_error(self, input: &str) -> ParseError {
        ParseError::new(input, self.message, self.offset)
    }
}

type Parsed<'a, T> = Result<(T, ScanCursor<'a>), Failure>;

/// Unwraps the text consumed by `next`, or fails with `message` at the
/// position where `next` stopped.
fn token<'a>(next: ScanCursor<'a>, message: &str) -> Parsed<'a, &'a str> {
    match next.value() {
        Some(text) => Ok((text, next)),
        None => Err(Failure::at(next, message)),
    }
}

/// Parse a sequence of entry patterns such as `/kurzy/daweb/*`.
pub fn parse_entry_query(text: &str) -> Result<EntryQuery, ParseError> {
    let (patterns, _) = entry_patterns(ScanCursor::new(text)).map_err(|f| f.into_error(text))?;
    Ok(EntryQuery(patterns))
}

/// Parse an access rule: optional time limits followed by entry patterns.
pub fn parse_access_rule(text: &str) -> Result<AccessRule, ParseError> {
    access_rule(ScanCursor::new(text)).map_err(|f| f.into_error(text))
}

fn access_rule(cursor: ScanCursor<'_>) -> Result<AccessRule, Failure> {
    let ((after, until), cursor) = time_limits(cursor.skip_whitespace())?;
    let (patterns, _) = entry_patterns(cursor)?;
    Ok(AccessRule {
        query: EntryQuery(patterns),
        after,
        until,
    })
}

fn time_limits(cursor: ScanCursor<'_>) -> Parsed<'_, (Option<Timestamp>, Option<Timestamp>)> {
    let keyword = cursor.read_literal_one_of(&["after", "until"]);
    match keyword.value() {
        Some("after") => {
            let (after, next) = timestamp_after_keyword(keyword, "after")?;
            let probe = next.read_whitespace().read_literal_one_of(&["until"]);
            if !probe.is_ready() {
                return Ok(((Some(after), None), next));
            }
            let (until, next) = timestamp_after_keyword(probe, "until")?;
            Ok(((Some(after), Some(until)), next))
        }
        Some("until") => {
            let (until, next) = timestamp_after_keyword(keyword, "until")?;
            Ok(((None, Some(until)), next))
        }
        _ => Ok(((None, None), cursor)),
    }
}

fn timestamp_after_keyword<'a>(cursor: ScanCursor<'a>, keyword: &str) -> Parsed<'a, Timestamp> {
    let (_, cursor) = token(
        cursor.read_whitespace(),
        &format!("expected whitespace after `{keyword}`"),
    )?;
    timestamp(cursor)
}

fn timestamp(cursor: ScanCursor<'_>) -> Parsed<'_, Timestamp> {
    let (text, next) = token(
        cursor.read_pattern(&DATETIME),
        "expected date-time in YYYY-MM-DDTHH:mm format",
    )?;
    let instant = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT)
        .map_err(|e| Failure::at(cursor, format!("invalid date-time `{text}`: {e}")))?;
    Ok((instant, next))
}

fn entry_patterns(cursor: ScanCursor<'_>) -> Parsed<'_, Vec<EntryPattern>> {
    let mut patterns = Vec::new();
    let mut cursor = cursor;
    loop {
        cursor = cursor.skip_whitespace();
        if cursor.is_eof() {
            return Ok((patterns, cursor));
        }
        let (pattern, next) = entry_pattern(cursor)?;
        patterns.push(pattern);
        cursor = next;
    }
}

fn entry_pattern(cursor: ScanCursor<'_>) -> Parsed<'_, EntryPattern> {
    let (_, cursor) = token(cursor.read_char(&['/']), "expected `/`")?;
    let (name, cursor) = token(
        cursor.skip_whitespace().read_pattern(&ENTRY_NAME),
        "expected entry name, `*` or `**`",
    )?;
    let name = NamePattern::parse(name);

    let cursor = cursor.skip_whitespace();
    if cursor.peek() != Some('[') {
        return Ok((EntryPattern { name, filter: None }, cursor));
    }
    let (filter, cursor) = property_filter(cursor)?;
    Ok((
        EntryPattern {
            name,
            filter: Some(filter),
        },
        cursor,
    ))
}

fn property_filter(cursor: ScanCursor<'_>) -> Parsed<'_, PropertyFilter> {
    let (_, cursor) = token(cursor.read_char(&['[']), "expected `[`")?;
    let (_, cursor) = token(
        cursor.skip_whitespace().read_char(&['@']),
        "expected `@` before property name",
    )?;
    let (name, cursor) = token(cursor.read_pattern(&IDENTIFIER), "expected property name")?;
    let (op_text, after_op) = token(
        cursor.skip_whitespace().read_literal_one_of(OPERATORS),
        "expected operator (=, ==, !=, *=, ^=, $=, <, <=, >, >=)",
    )?;
    let op = Operator::from_token(op_text)
        .ok_or_else(|| Failure::at(cursor.skip_whitespace(), format!("unknown operator `{op_text}`")))?;
    let (value, cursor) = property_value(after_op.skip_whitespace())?;
    let (_, cursor) = token(cursor.skip_whitespace().read_char(&[']']), "expected `]`")?;
    Ok((
        PropertyFilter {
            name: name.to_string(),
            op,
            value,
        },
        cursor,
    ))
}

fn property_value(cursor: ScanCursor<'_>) -> Parsed<'_, PropertyValue> {
    let next = cursor.read_pattern(&STRING);
    if let Some(text) = next.value() {
        let decoded = serde_json::from_str::<String>(text)
            .map_err(|e| Failure::at(cursor, format!("invalid string literal: {e}")))?;
        return Ok((PropertyValue::String(decoded), next));
    }

    let next = cursor.read_pattern(&BOOLEAN);
    if let Some(text) = next.value() {
        return Ok((PropertyValue::Bool(text == "true"), next));
    }

    let next = cursor.read_pattern(&NULL);
    if next.is_ready() {
        return Ok((PropertyValue::Null, next));
    }

    let next = cursor.read_pattern(&NUMBER);
    if let Some(text) = next.value() {
        let number = text
            .parse::<f64>()
            .map_err(|e| Failure::at(cursor, format!("invalid number `{text}`: {e}")))?;
        return Ok((PropertyValue::Number(number), next));
    }

    Err(Failure::at(
        cursor,
        "expected a string, boolean, null or number",
    ))
}
