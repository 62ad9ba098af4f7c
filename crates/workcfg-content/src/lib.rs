//! Comment-preserving editing of configuration documents
//!
//! Reads TOML, JSON and JSONC configuration files into plain JSON values
//! and applies structural patches to them. JSON and JSONC edits are made
//! as positional text edits, so comments and unrelated formatting survive.

pub mod convert;
pub mod diff;
pub mod document;
pub mod edit;
pub mod error;
pub mod format;
pub mod jsonc;
pub mod patch;
pub mod path;
pub mod snippet;

pub use diff::render_diff;
pub use document::RawDocument;
pub use edit::{Edit, apply_edits};
pub use error::{Error, Result};
pub use format::ConfigFormat;
pub use patch::{PatchMode, PatchOptions, apply_path_edits, flatten_patch, patch_config, patch_text};
pub use path::{PathSegment, display_path, parse_path};
pub use snippet::render_snippet;
