//! Structural edits that keep the rest of a JSONC document intact

use serde_json::Value;

use super::tree::{Node, NodeKind, find_node_at_location, parse_tree};
use crate::edit::Edit;
use crate::error::{Error, Result};
use crate::path::PathSegment;

/// Options for [`modify`].
#[derive(Debug, Clone, Default)]
pub struct ModifyOptions {
    /// Insert at an array index instead of replacing the element there.
    pub array_insertion: bool,
}

/// Compute the edit that sets `path` to `value` in `text`.
///
/// Missing ancestors are created. Comments and formatting outside the
/// touched range are left alone. The inserted JSON is compact; run the
/// formatter over the result to lay it out.
pub fn modify(
    text: &str,
    path: &[PathSegment],
    value: &Value,
    options: &ModifyOptions,
) -> Result<Vec<Edit>> {
    let root = parse_tree(text)?;
    let mut value = value.clone();
    let mut path = path.to_vec();
    let mut parent: Option<&Node> = None;
    let mut last_segment: Option<PathSegment> = None;

    while let Some(segment) = path.pop() {
        parent = root.as_ref().and_then(|root| find_node_at_location(root, &path));
        if parent.is_some() {
            last_segment = Some(segment);
            break;
        }
        value = match &segment {
            PathSegment::Key(key) => {
                let mut map = serde_json::Map::new();
                map.insert(key.clone(), value);
                Value::Object(map)
            }
            PathSegment::Index(_) | PathSegment::Append => Value::Array(vec![value]),
        };
        last_segment = Some(segment);
    }

    let content = serde_json::to_string(&value)?;

    let (Some(parent), Some(segment)) = (parent, last_segment) else {
        let (offset, length) = root.as_ref().map_or((0, 0), |root| (root.offset, root.length));
        return Ok(vec![Edit::new(offset, length, content)]);
    };

    let edit = match (parent.kind, &segment) {
        (NodeKind::Object, PathSegment::Key(key)) => {
            match find_node_at_location(parent, std::slice::from_ref(&segment)) {
                Some(existing) => Edit::new(existing.offset, existing.length, content),
                None => {
                    let property = format!("{}: {}", serde_json::to_string(key)?, content);
                    match parent.children.last() {
                        Some(previous) => Edit::insert(previous.end(), format!(",{property}")),
                        None => Edit::insert(parent.offset + 1, property),
                    }
                }
            }
        }
        (NodeKind::Array, PathSegment::Append) => match parent.children.last() {
            Some(previous) => Edit::insert(previous.end(), format!(",{content}")),
            None => Edit::insert(parent.offset + 1, content),
        },
        (NodeKind::Array, PathSegment::Index(index)) => {
            let index = *index;
            let children = &parent.children;
            if !options.array_insertion && index < children.len() {
                let existing = &children[index];
                Edit::new(existing.offset, existing.length, content)
            } else if children.is_empty() {
                Edit::insert(parent.offset + 1, content)
            } else if index == 0 {
                Edit::insert(parent.offset + 1, format!("{content},"))
            } else {
                let previous = &children[index.min(children.len()) - 1];
                Edit::insert(previous.end(), format!(",{content}"))
            }
        }
        (kind, segment) => {
            let target = match segment {
                PathSegment::Key(_) => "property",
                _ => "index",
            };
            return Err(Error::InvalidEdit {
                message: format!(
                    "Can not add {target} {segment} to parent of type {}",
                    kind.as_str()
                ),
            });
        }
    };

    Ok(vec![edit])
}
