//! Interfaces the engine consumes from the content tree, and a small
//! in-memory catalog implementing them for policy files and tests.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::access::query::PropertyValue;

pub type PropertyMap = BTreeMap<String, PropertyValue>;

/// One node of the content tree.
pub trait Entry {
    fn name(&self) -> &str;
    /// Typed lookup into the entry's data; `None` when the property is absent.
    fn property(&self, name: &str) -> Option<&PropertyValue>;
}

/// Entry carrying the access metadata the decision engine needs.
pub trait AccessEntry: Entry {
    /// Path segment the claim automaton is stepped with.
    fn link(&self) -> &str;
    fn access(&self) -> Access;
    fn is_draft(&self) -> bool;
    fn authors(&self) -> &[String];
}

/// A position in the content tree.
pub trait Cursor {
    type Entry: Entry;

    /// Entries from the root (inclusive) down to the current position.
    fn path(&self) -> Vec<&Self::Entry>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Access {
    #[default]
    Public,
    LoggedIn,
    Claim,
    Deny,
}

impl Access {
    pub fn as_str(&self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::LoggedIn => "logged-in",
            Access::Claim => "claim",
            Access::Deny => "deny",
        }
    }
}

impl FromStr for Access {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "public" => Ok(Access::Public),
            "logged-in" => Ok(Access::LoggedIn),
            "claim" => Ok(Access::Claim),
            "deny" => Ok(Access::Deny),
            other => Err(format!(
                "unknown access level `{other}` (expected public, logged-in, claim or deny)"
            )),
        }
    }
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub link: String,
    pub access: Access,
    pub draft: bool,
    pub authors: Vec<String>,
    pub data: PropertyMap,
    pub children: Vec<CatalogEntry>,
}

impl CatalogEntry {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            link: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.link = link.to_string();
        self
    }

    /// Marks the entry as a draft visible only to `authors`.
    pub fn draft_by(mut self, authors: &[&str]) -> Self {
        self.draft = true;
        self.authors = authors.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_property(mut self, name: &str, value: PropertyValue) -> Self {
        self.data.insert(name.to_string(), value);
        self
    }

    pub fn with_child(mut self, child: CatalogEntry) -> Self {
        self.children.push(child);
        self
    }

    pub fn child(&self, name: &str) -> Option<&CatalogEntry> {
        self.children.iter().find(|c| c.name == name)
    }
}

impl Entry for CatalogEntry {
    fn name(&self) -> &str {
        &self.name
    }

    fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.data.get(name)
    }
}

impl AccessEntry for CatalogEntry {
    fn link(&self) -> &str {
        &self.link
    }

    fn access(&self) -> Access {
        self.access
    }

    fn is_draft(&self) -> bool {
        self.draft
    }

    fn authors(&self) -> &[String] {
        &self.authors
    }
}

/// In-memory content tree rooted at an unnamed public entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    root: CatalogEntry,
}

impl Catalog {
    pub fn new(children: Vec<CatalogEntry>) -> Self {
        Self {
            root: CatalogEntry {
                children,
                ..CatalogEntry::new("")
            },
        }
    }

    pub fn root(&self) -> &CatalogEntry {
        &self.root
    }

    pub fn cursor(&self) -> CatalogCursor<'_> {
        CatalogCursor {
            path: vec![self.root()],
        }
    }

    /// Cursor for a slash-separated path of entry names, e.g. `/kurzy/daweb`.
    pub fn locate(&self, path: &str) -> Option<CatalogCursor<'_>> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self.cursor(), |cursor, segment| cursor.child(segment))
    }

    /// Number of entries below the root.
    pub fn len(&self) -> usize {
        fn count(entry: &CatalogEntry) -> usize {
            entry.children.iter().map(|c| 1 + count(c)).sum()
        }
        count(self.root())
    }

    pub fn is_empty(&self) -> bool {
        self.root().children.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct CatalogCursor<'a> {
    path: Vec<&'a CatalogEntry>,
}

impl<'a> CatalogCursor<'a> {
    pub fn entry(&self) -> &'a CatalogEntry {
        // a cursor always holds at least the root
        self.path[self.path.len() - 1]
    }

    pub fn child(&self, name: &str) -> Option<Self> {
        let child = self.entry().child(name)?;
        Some(self.descend(child))
    }

    pub fn children(&self) -> impl Iterator<Item = CatalogCursor<'a>> + '_ {
        self.entry().children.iter().map(|child| self.descend(child))
    }

    fn descend(&self, child: &'a CatalogEntry) -> Self {
        let mut path = self.path.clone();
        path.push(child);
        Self { path }
    }

    /// Slash-joined links of every entry below the root; `/` for the root.
    pub fn link_path(&self) -> String {
        if self.path.len() == 1 {
            return "/".to_string();
        }
        self.path[1..]
            .iter()
            .map(|entry| format!("/{}", entry.link))
            .collect()
    }
}

impl<'a> Cursor for CatalogCursor<'a> {
    type Entry = CatalogEntry;

    fn path(&self) -> Vec<&CatalogEntry> {
        self.path.clone()
    }
}
