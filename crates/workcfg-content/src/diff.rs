//! Unified diffs of configuration text

use similar::TextDiff;

/// Render a unified line diff between two versions of a file.
///
/// Returns an empty string when the texts are identical.
pub fn render_diff(path: &str, old: &str, new: &str) -> String {
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(&format!("a/{path}"), &format!("b/{path}"))
        .to_string()
}
