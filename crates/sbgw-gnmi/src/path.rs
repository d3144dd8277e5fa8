//! Logical path strings <-> gNMI `Path` messages
//!
//! Path strings look like `origin:elem/elem[key=value,key2=value2]/elem`.
//! Key values may contain `/`; brackets are matched before splitting.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::proto::{Path, PathElem};

/// Default namespace prepended to every logical path
pub const DEFAULT_PATH_PREFIX: &str = "openconfig:";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty path")]
    Empty,

    #[error("unbalanced brackets in path '{0}'")]
    Unbalanced(String),

    #[error("invalid key '{key}' in path '{path}'")]
    InvalidKey { path: String, key: String },

    #[error("empty element in path '{0}'")]
    EmptyElement(String),
}

/// Namespaces logical paths before they go on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GnmiPathMapper {
    prefix: String,
}

impl Default for GnmiPathMapper {
    fn default() -> Self {
        Self::new(DEFAULT_PATH_PREFIX)
    }
}

impl GnmiPathMapper {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Prefixed path string, as sent to the device
    pub fn qualify(&self, logical: &str) -> String {
        format!("{}{}", self.prefix, logical)
    }

    /// Parse a logical path into a wire `Path`
    pub fn to_path(&self, logical: &str) -> Result<Path, PathError> {
        if logical.trim().is_empty() {
            return Err(PathError::Empty);
        }
        parse_path(&self.qualify(logical))
    }
}

/// Parse `origin:elem/elem[k=v]` into a `Path`
pub fn parse_path(path: &str) -> Result<Path, PathError> {
    let (origin, rest) = split_origin(path);
    let rest = rest.trim_start_matches('/');

    let mut elem = Vec::new();
    for segment in split_segments(rest, path)? {
        elem.push(parse_segment(segment, path)?);
    }

    Ok(Path {
        origin: origin.to_string(),
        elem,
        target: String::new(),
    })
}

// An origin is a `name:` head that comes before any `/` or `[`
fn split_origin(path: &str) -> (&str, &str) {
    let boundary = path.find(['/', '[']).unwrap_or(path.len());
    match path[..boundary].find(':') {
        Some(colon) => (&path[..colon], &path[colon + 1..]),
        None => ("", path),
    }
}

fn split_segments<'a>(rest: &'a str, full: &str) -> Result<Vec<&'a str>, PathError> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in rest.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| PathError::Unbalanced(full.to_string()))?
            }
            '/' if depth == 0 => {
                segments.push(&rest[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(PathError::Unbalanced(full.to_string()));
    }
    if start < rest.len() {
        segments.push(&rest[start..]);
    } else if !segments.is_empty() {
        // trailing slash
        return Err(PathError::EmptyElement(full.to_string()));
    }

    if segments.iter().any(|s| s.is_empty()) {
        return Err(PathError::EmptyElement(full.to_string()));
    }
    Ok(segments)
}

fn parse_segment(segment: &str, full: &str) -> Result<PathElem, PathError> {
    let Some(open) = segment.find('[') else {
        return Ok(PathElem {
            name: segment.to_string(),
            key: BTreeMap::new(),
        });
    };

    let name = &segment[..open];
    if name.is_empty() {
        return Err(PathError::EmptyElement(full.to_string()));
    }

    // Accept both `[a=1,b=2]` and `[a=1][b=2]`
    let mut key = BTreeMap::new();
    let mut rest = &segment[open..];
    while !rest.is_empty() {
        let inner = rest
            .strip_prefix('[')
            .and_then(|r| r.find(']').map(|close| (&r[..close], &r[close + 1..])));
        let (body, tail) = inner.ok_or_else(|| PathError::Unbalanced(full.to_string()))?;
        for pair in body.split(',') {
            let (k, v) = pair
                .split_once('=')
                .filter(|(k, _)| !k.trim().is_empty())
                .ok_or_else(|| PathError::InvalidKey {
                    path: full.to_string(),
                    key: pair.to_string(),
                })?;
            key.insert(k.trim().to_string(), v.trim().to_string());
        }
        rest = tail;
    }

    Ok(PathElem {
        name: name.to_string(),
        key,
    })
}

/// Render a `Path` back to its string form
pub fn path_to_string(path: &Path) -> String {
    let elems = elems_to_string(&path.elem);
    if path.origin.is_empty() {
        elems
    } else {
        format!("{}:{}", path.origin, elems)
    }
}

/// Render `prefix` + `path` as one string, as a notification addresses an update
pub fn join_paths(prefix: Option<&Path>, path: Option<&Path>) -> String {
    let origin = path
        .map(|p| p.origin.as_str())
        .filter(|o| !o.is_empty())
        .or_else(|| prefix.map(|p| p.origin.as_str()))
        .unwrap_or("");

    let mut elem = prefix.map(|p| p.elem.clone()).unwrap_or_default();
    if let Some(path) = path {
        elem.extend(path.elem.iter().cloned());
    }

    path_to_string(&Path {
        origin: origin.to_string(),
        elem,
        target: String::new(),
    })
}

fn elems_to_string(elems: &[PathElem]) -> String {
    elems
        .iter()
        .map(|elem| {
            if elem.key.is_empty() {
                elem.name.clone()
            } else {
                let keys: Vec<String> = elem
                    .key
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect();
                format!("{}[{}]", elem.name, keys.join(","))
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
