//! JSON paths and their positions in source text

use crate::utils::offset_to_position;
use lsp_types::Position;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a node inside a JSON document, from the root down.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JsonPath(Vec<PathSegment>);

impl JsonPath {
    pub fn root() -> Self {
        Self(vec![])
    }

    pub fn from_keys(keys: &[&str]) -> Self {
        Self(keys.iter().map(|k| PathSegment::Key(k.to_string())).collect())
    }

    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self(segments)
    }

    /// Parses the fragment of a JSON reference such as `#/definitions/Pet`.
    pub fn from_pointer(pointer: &str) -> Option<Self> {
        let pointer = pointer.strip_prefix('#').unwrap_or(pointer);
        if pointer.is_empty() {
            return Some(Self::root());
        }
        let rest = pointer.strip_prefix('/')?;
        let segments = rest
            .split('/')
            .map(|raw| PathSegment::Key(raw.replace("~1", "/").replace("~0", "~")))
            .collect();
        Some(Self(segments))
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    pub fn child_key(&self, key: &str) -> Self {
        let mut child = self.clone();
        child.push(PathSegment::Key(key.to_string()));
        child
    }

    pub fn child_index(&self, index: usize) -> Self {
        let mut child = self.clone();
        child.push(PathSegment::Index(index));
        child
    }

    /// Last key segment, if the path ends in one.
    pub fn last_key(&self) -> Option<&str> {
        match self.0.last()? {
            PathSegment::Key(key) => Some(key),
            PathSegment::Index(_) => None,
        }
    }

    /// The node at this path inside `value`. Key segments also address array
    /// elements when they are numeric, as JSON pointers do.
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        for segment in &self.0 {
            current = match (segment, current) {
                (PathSegment::Key(key), Value::Object(map)) => map.get(key)?,
                (PathSegment::Key(key), Value::Array(items)) => items.get(key.parse::<usize>().ok()?)?,
                (PathSegment::Index(index), Value::Array(items)) => items.get(*index)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Key(key) if is_identifier(key) => write!(f, ".{key}")?,
                PathSegment::Key(key) => write!(f, "['{}']", key.replace('\'', "\\'"))?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Best effort position of the node at `path` in JSON or YAML `text`.
///
/// Keys are searched one after another, each after the previous match, so the
/// result is the deepest key that could be found. Index segments don't move
/// the cursor. Returns `None` when not even the first key occurs.
pub fn locate_path(text: &str, path: &JsonPath) -> Option<Position> {
    let mut cursor = 0;
    let mut found = None;
    for segment in path.segments() {
        let PathSegment::Key(key) = segment else {
            continue;
        };
        match find_key(text, cursor, key) {
            Some(offset) => {
                found = Some(offset);
                cursor = offset + key.len();
            }
            None if found.is_none() => return None,
            None => break,
        }
    }
    Some(offset_to_position(text, found.unwrap_or(0)))
}

/// Byte offset of the first occurrence of `key` used as a mapping key at or
/// after `from`, quoted or not.
fn find_key(text: &str, from: usize, key: &str) -> Option<usize> {
    let quoted = format!("\"{key}\"");
    let mut candidates = vec![];

    let mut search = from;
    while let Some(found) = text[search..].find(&quoted) {
        let at = search + found;
        let after = text[at + quoted.len()..].trim_start_matches([' ', '\t']);
        if after.starts_with(':') {
            // point at the key itself, not the opening quote
            candidates.push(at + 1);
            break;
        }
        search = at + quoted.len();
    }

    let mut search = from;
    while let Some(found) = text[search..].find(key) {
        let at = search + found;
        let line_start = text[..at].rfind('\n').map_or(0, |i| i + 1);
        let indentation = &text[line_start..at];
        if indentation.chars().all(|c| c == ' ' || c == '-') && text[at + key.len()..].starts_with(':')
        {
            candidates.push(at);
            break;
        }
        search = at + key.len();
    }

    candidates.into_iter().min()
}
