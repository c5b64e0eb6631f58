/// A compiled single-segment name matcher.
///
/// `*` inside a segment matches any run of characters, anchored at both ends:
/// `foo*bar` matches exactly the names that start with `foo` and end with `bar`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Glob {
    /// Matches every name.
    Any,
    Literal(String),
    /// Literal parts that must appear in order, first part as a prefix and
    /// last part as a suffix.
    Parts(Vec<String>),
}

impl Glob {
    pub fn compile(pattern: &str) -> Self {
        if !pattern.contains('*') {
            return Glob::Literal(pattern.to_string());
        }
        if pattern.chars().all(|c| c == '*') {
            return Glob::Any;
        }
        Glob::Parts(pattern.split('*').map(str::to_string).collect())
    }

    pub fn is_match(&self, name: &str) -> bool {
        match self {
            Glob::Any => true,
            Glob::Literal(literal) => literal == name,
            Glob::Parts(parts) => match_parts(parts, name),
        }
    }
}

fn match_parts(parts: &[String], name: &str) -> bool {
    let (Some((first, rest)), Some(last)) = (parts.split_first(), parts.last()) else {
        return true;
    };
    let Some(mut remaining) = name.strip_prefix(first.as_str()) else {
        return false;
    };
    if rest.is_empty() {
        return remaining.is_empty();
    }
    for middle in &rest[..rest.len() - 1] {
        match remaining.find(middle.as_str()) {
            Some(at) => remaining = &remaining[at + middle.len()..],
            None => return false,
        }
    }
    remaining.ends_with(last.as_str())
}
