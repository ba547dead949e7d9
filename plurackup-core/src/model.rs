//! Domain data: plurks, responses and the identity directory.
//!
//! Wire payloads are decoded into these types by [`crate::client`]; the
//! renderers only ever see these.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Fixed timestamp format used by the server for `posted` fields (always UTC).
pub const SERVER_TIME_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Numeric reference to an account, as used in favorers, replurkers, audiences and responses.
pub type IdentityRef = i64;

/// Parses a server `posted` timestamp such as `Fri, 05 Jun 2009 23:07:13 GMT`.
pub fn parse_server_time(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw, SERVER_TIME_FORMAT).map(|naive| naive.and_utc())
}

/// Formats a timestamp back into the server's `posted` representation.
pub fn format_server_time(time: &DateTime<Utc>) -> String {
    time.format(SERVER_TIME_FORMAT).to_string()
}

/// Short permalink code for a plurk id: base 36, lowercase digits first.
pub fn base36(id: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if id == 0 {
        return "0".to_string();
    }
    let mut rest = id;
    let mut code = Vec::new();
    while rest > 0 {
        code.push(DIGITS[(rest % 36) as usize]);
        rest /= 36;
    }
    code.reverse();
    // only ASCII digits were pushed
    String::from_utf8(code).unwrap_or_default()
}

/// Who may see a plurk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Audience {
    /// No restriction.
    #[default]
    Public,
    /// Server sentinel `0` in first position: friends only.
    Friends,
    /// Explicit recipient list.
    Limited(Vec<IdentityRef>),
}

impl Audience {
    /// Builds an audience from the decoded reference list.
    pub fn from_refs(refs: Vec<IdentityRef>) -> Self {
        match refs.first() {
            None => Audience::Public,
            Some(0) => Audience::Friends,
            Some(_) => Audience::Limited(refs),
        }
    }

    /// Decodes the server's `limited_to` string (e.g. `|3||15|`) by pulling every digit run.
    pub fn parse_limited_to(raw: Option<&str>) -> Self {
        static DIGITS: OnceLock<Regex> = OnceLock::new();
        let Some(raw) = raw.filter(|s| !s.is_empty()) else {
            return Audience::Public;
        };
        let re = DIGITS.get_or_init(|| Regex::new(r"\d+").expect("static regex"));
        let refs = re
            .find_iter(raw)
            .filter_map(|m| m.as_str().parse::<IdentityRef>().ok())
            .collect();
        Audience::from_refs(refs)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Audience::Public)
    }
}

/// A response attached to a plurk.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub id: i64,
    pub author: IdentityRef,
    pub posted: DateTime<Utc>,
    pub lang: String,
    pub qualifier: String,
    pub qualifier_translated: String,
    /// Source text as typed by the author.
    pub content_raw: String,
    /// Server-rendered HTML.
    pub content: String,
}

/// A single timeline entry. Everything but `replies` is fixed at decode time.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: i64,
    pub posted: DateTime<Utc>,
    pub lang: String,
    pub qualifier: String,
    pub qualifier_translated: String,
    pub content_raw: String,
    pub content: String,
    pub favorite_count: u64,
    pub favorers: Vec<IdentityRef>,
    pub replurkers_count: u64,
    pub replurkers: Vec<IdentityRef>,
    pub audience: Audience,
    pub replies: Vec<Reply>,
}

impl Post {
    /// Permalink code used in `http://www.plurk.com/p/<code>`.
    pub fn permalink_code(&self) -> String {
        base36(self.id.max(0) as u64)
    }
}

/// A resolved account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub handle: String,
    pub display_name: String,
}

impl Identity {
    /// Display name falls back to the handle when absent or empty.
    pub fn new(handle: impl Into<String>, display_name: Option<String>) -> Self {
        let handle = handle.into();
        let display_name = display_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| handle.clone());
        Self {
            handle,
            display_name,
        }
    }
}

/// Mapping from identity reference to account. Merges are last-write-wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityDirectory {
    entries: BTreeMap<IdentityRef, Identity>,
}

impl IdentityDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: IdentityRef, identity: Identity) {
        self.entries.insert(id, identity);
    }

    /// Unions `other` into `self`; colliding keys take `other`'s value.
    pub fn merge(&mut self, other: IdentityDirectory) {
        self.entries.extend(other.entries);
    }

    /// `None` means an unknown or deleted account.
    pub fn get(&self, id: IdentityRef) -> Option<&Identity> {
        self.entries.get(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IdentityRef, &Identity)> {
        self.entries.iter()
    }
}

impl FromIterator<(IdentityRef, Identity)> for IdentityDirectory {
    fn from_iter<T: IntoIterator<Item = (IdentityRef, Identity)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
