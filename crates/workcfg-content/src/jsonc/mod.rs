//! JSON with comments: scanning, parsing, formatting and structural edits

mod edit;
mod format;
mod scanner;
mod tree;

pub use edit::{ModifyOptions, modify};
pub use format::{FormattingOptions, detect_eol, format};
pub use scanner::{ScanError, Scanner, SyntaxKind};
pub use tree::{Node, NodeKind, find_node_at_location, parse_tree, parse_value};
