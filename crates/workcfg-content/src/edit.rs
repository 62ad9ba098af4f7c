//! Positional text edits

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Replace `length` bytes at `offset` with `content`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub offset: usize,
    pub length: usize,
    pub content: String,
}

impl Edit {
    pub fn new(offset: usize, length: usize, content: impl Into<String>) -> Self {
        Self {
            offset,
            length,
            content: content.into(),
        }
    }

    pub fn insert(offset: usize, content: impl Into<String>) -> Self {
        Self::new(offset, 0, content)
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Apply this edit to `text`.
    pub fn apply(&self, text: &str) -> Result<String> {
        let prefix = text.get(..self.offset).ok_or_else(|| self.out_of_bounds(text))?;
        let suffix = text.get(self.end()..).ok_or_else(|| self.out_of_bounds(text))?;
        let mut out = String::with_capacity(prefix.len() + self.content.len() + suffix.len());
        out.push_str(prefix);
        out.push_str(&self.content);
        out.push_str(suffix);
        Ok(out)
    }

    fn out_of_bounds(&self, text: &str) -> Error {
        Error::InvalidEdit {
            message: format!(
                "edit {}..{} does not fit a document of {} bytes",
                self.offset,
                self.end(),
                text.len()
            ),
        }
    }
}

/// Apply a set of non-overlapping edits to `text`.
///
/// Edits are applied back to front so every offset refers to the original text.
pub fn apply_edits(text: &str, edits: &[Edit]) -> Result<String> {
    let mut sorted: Vec<&Edit> = edits.iter().collect();
    sorted.sort_by_key(|e| (e.offset, e.length));

    let mut result = text.to_string();
    let mut last_modified = text.len();
    for edit in sorted.into_iter().rev() {
        if edit.end() > last_modified {
            return Err(Error::InvalidEdit {
                message: format!("overlapping edit at offset {}", edit.offset),
            });
        }
        result = edit.apply(&result)?;
        last_modified = edit.offset;
    }
    Ok(result)
}
