//! Structural paths into configuration documents

use std::fmt;

/// One step of a path into a JSON-like document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A key in an object (e.g. `kv_namespaces`)
    Key(String),
    /// An existing position in an array
    Index(usize),
    /// The position after the last element of an array
    Append,
}

impl PathSegment {
    pub fn key(key: impl Into<String>) -> Self {
        Self::Key(key.into())
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "{key}"),
            Self::Index(index) => write!(f, "[{index}]"),
            Self::Append => write!(f, "[-1]"),
        }
    }
}

/// Render a path the way diagnostics quote it: `kv_namespaces[0].binding`.
pub fn display_path(path: &[PathSegment]) -> String {
    let mut out = String::new();
    for segment in path {
        if matches!(segment, PathSegment::Key(_)) && !out.is_empty() {
            out.push('.');
        }
        out.push_str(&segment.to_string());
    }
    out
}

/// Parse a dotted path such as `kv_namespaces[0].binding`.
///
/// `[]` and `[-1]` both mean "append".
pub fn parse_path(path: &str) -> Vec<PathSegment> {
    let mut segments = Vec::new();
    let mut current_key = String::new();
    let mut chars = path.chars();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if !current_key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current_key)));
                }
            }
            '[' => {
                if !current_key.is_empty() {
                    segments.push(PathSegment::Key(std::mem::take(&mut current_key)));
                }
                let index: String = chars.by_ref().take_while(|c| *c != ']').collect();
                match index.trim() {
                    "" | "-1" => segments.push(PathSegment::Append),
                    other => {
                        if let Ok(index) = other.parse::<usize>() {
                            segments.push(PathSegment::Index(index));
                        }
                    }
                }
            }
            _ => current_key.push(ch),
        }
    }

    if !current_key.is_empty() {
        segments.push(PathSegment::Key(current_key));
    }

    segments
}
