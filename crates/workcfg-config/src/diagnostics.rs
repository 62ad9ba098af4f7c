//! Tree of validation errors and warnings
//!
//! Every normalization pass records its findings in a [`Diagnostics`] node.
//! Nested sections (a named environment, one binding) get a child node so the
//! rendered report reads like an outline.

use serde::Serialize;

/// Errors and warnings collected for one section of a configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub description: String,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub children: Vec<Diagnostics>,
}

#[derive(Clone, Copy)]
enum Kind {
    Errors,
    Warnings,
}

impl Diagnostics {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Attach `child` if it carries any message; empty subtrees are dropped.
    pub fn add_child(&mut self, child: Diagnostics) {
        if child.has_errors() || child.has_warnings() {
            self.children.push(child);
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty() || self.children.iter().any(Diagnostics::has_errors)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty() || self.children.iter().any(Diagnostics::has_warnings)
    }

    pub fn render_errors(&self) -> String {
        self.render(Kind::Errors)
    }

    pub fn render_warnings(&self) -> String {
        self.render(Kind::Warnings)
    }

    fn has(&self, kind: Kind) -> bool {
        match kind {
            Kind::Errors => self.has_errors(),
            Kind::Warnings => self.has_warnings(),
        }
    }

    fn own(&self, kind: Kind) -> &[String] {
        match kind {
            Kind::Errors => &self.errors,
            Kind::Warnings => &self.warnings,
        }
    }

    fn render(&self, kind: Kind) -> String {
        if !self.has(kind) {
            return String::new();
        }

        let own = self
            .own(kind)
            .iter()
            .map(|message| format!("- {}", indent_text(message)))
            .collect::<Vec<_>>()
            .join("\n");
        let children: String = self
            .children
            .iter()
            .filter(|child| child.has(kind))
            .map(|child| format!("\n- {}", child.render(kind)))
            .collect();

        indent_text(&format!("{}\n{own}{children}", self.description))
    }
}

/// Indent every line after the first by two spaces; whitespace-only lines become empty.
fn indent_text(text: &str) -> String {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| {
            if line.trim().is_empty() {
                String::new()
            } else if i == 0 {
                line.to_string()
            } else {
                format!("  {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
