//! Whitespace formatter for JSONC documents
//!
//! Rewrites only the trivia between tokens. Comments are kept verbatim,
//! including the inner lines of block comments.

use std::ops::Range;

use super::scanner::{BOM, ScanError, Scanner, SyntaxKind};
use crate::edit::Edit;

/// Layout options for [`format`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattingOptions {
    /// Indent with `tab_size` spaces instead of a tab.
    pub insert_spaces: bool,
    pub tab_size: usize,
    /// Line ending used when the document has none of its own.
    pub eol: Option<String>,
    /// Keep existing line breaks between tokens instead of normalizing them.
    pub keep_lines: bool,
    pub insert_final_newline: bool,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            insert_spaces: false,
            tab_size: 4,
            eol: None,
            keep_lines: false,
            insert_final_newline: false,
        }
    }
}

impl FormattingOptions {
    pub fn spaces(tab_size: usize) -> Self {
        Self {
            insert_spaces: true,
            tab_size,
            ..Self::default()
        }
    }

    fn indent_unit(&self) -> String {
        if self.insert_spaces {
            " ".repeat(self.effective_tab_size())
        } else {
            "\t".to_string()
        }
    }

    fn effective_tab_size(&self) -> usize {
        if self.tab_size == 0 { 4 } else { self.tab_size }
    }
}

/// Line ending of `text`: its first line break, else the configured one, else `\n`.
pub fn detect_eol(options: &FormattingOptions, text: &str) -> String {
    let bytes = text.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        match b {
            b'\r' if bytes.get(i + 1) == Some(&b'\n') => return "\r\n".to_string(),
            b'\r' => return "\r".to_string(),
            b'\n' => return "\n".to_string(),
            _ => {}
        }
    }
    options.eol.clone().unwrap_or_else(|| "\n".to_string())
}

fn is_eol(text: &[u8], offset: usize) -> bool {
    matches!(text.get(offset), Some(b'\r' | b'\n'))
}

fn indent_level_of(content: &str, options: &FormattingOptions) -> usize {
    let tab_size = options.effective_tab_size();
    let mut columns = 0;
    for ch in content.chars() {
        match ch {
            ' ' => columns += 1,
            '\t' => columns += tab_size,
            _ => break,
        }
    }
    columns / tab_size
}

/// Compute the edits that normalize whitespace in `text`.
///
/// With a `range`, only the lines touching that byte range are formatted.
pub fn format(text: &str, range: Option<Range<usize>>, options: &FormattingOptions) -> Vec<Edit> {
    let bytes = text.as_bytes();
    // A byte order mark is kept as is and never counted as indentation.
    let bom = if text.starts_with(BOM) { BOM.len() } else { 0 };
    let (format_start, format_text, initial_level) = match &range {
        Some(range) => {
            let mut start = range.start.clamp(bom, text.len());
            while start > bom && !is_eol(bytes, start - 1) {
                start -= 1;
            }
            let mut end = range.end.clamp(start, text.len());
            while end < text.len() && !is_eol(bytes, end) {
                end += 1;
            }
            let slice = &text[start..end];
            (start, slice, indent_level_of(slice, options))
        }
        None => (bom, &text[bom..], 0),
    };

    let mut formatter = Formatter {
        document: text,
        scanner: Scanner::new(format_text),
        base: format_start,
        range,
        eol: detect_eol(options, text),
        indent: options.indent_unit(),
        keep_lines: options.keep_lines,
        initial_level,
        level: 0,
        line_breaks: 0,
        has_error: false,
        edits: Vec::new(),
    };
    formatter.run(options.insert_final_newline);
    formatter.edits
}

struct Formatter<'a> {
    document: &'a str,
    scanner: Scanner<'a>,
    base: usize,
    range: Option<Range<usize>>,
    eol: String,
    indent: String,
    keep_lines: bool,
    initial_level: usize,
    level: usize,
    line_breaks: usize,
    has_error: bool,
    edits: Vec<Edit>,
}

impl Formatter<'_> {
    fn newlines_and_indent(&self) -> String {
        let breaks = self.line_breaks.max(1);
        let mut out = self.eol.repeat(breaks);
        out.push_str(&self.indent.repeat(self.initial_level + self.level));
        out
    }

    fn scan_next(&mut self) -> SyntaxKind {
        let mut token = self.scanner.scan();
        self.line_breaks = 0;
        while matches!(token, SyntaxKind::Trivia | SyntaxKind::LineBreak) {
            if token == SyntaxKind::LineBreak {
                if self.keep_lines {
                    self.line_breaks += 1;
                } else {
                    self.line_breaks = 1;
                }
            }
            token = self.scanner.scan();
        }
        self.has_error = token == SyntaxKind::Unknown || self.scanner.error() != ScanError::None;
        token
    }

    fn token_start(&self) -> usize {
        self.base + self.scanner.token_offset()
    }

    fn token_end(&self) -> usize {
        self.base + self.scanner.token_end()
    }

    fn add_edit(&mut self, content: String, start: usize, end: usize) {
        if self.has_error {
            return;
        }
        if let Some(range) = &self.range {
            if !(start < range.end && end > range.start) {
                return;
            }
        }
        if self.document.get(start..end) == Some(content.as_str()) {
            return;
        }
        self.edits.push(Edit::new(start, end - start, content));
    }

    fn run(&mut self, insert_final_newline: bool) {
        let mut first = self.scan_next();
        if self.keep_lines && self.line_breaks > 0 {
            let content = self.eol.repeat(self.line_breaks);
            self.add_edit(content, 0, 0);
        }

        if first != SyntaxKind::Eof {
            let initial = self.indent.repeat(self.initial_level);
            let first_start = self.token_start();
            self.add_edit(initial, self.base, first_start);
        }

        while first != SyntaxKind::Eof {
            let mut first_end = self.token_end();
            let mut second = self.scan_next();
            let mut replace = String::new();
            let mut needs_line_break = false;

            // Comments on the same line stay attached to the preceding token
            while self.line_breaks == 0
                && matches!(second, SyntaxKind::LineComment | SyntaxKind::BlockComment)
            {
                let comment_start = self.token_start();
                self.add_edit(" ".to_string(), first_end, comment_start);
                first_end = self.token_end();
                needs_line_break = second == SyntaxKind::LineComment;
                replace = if needs_line_break {
                    self.newlines_and_indent()
                } else {
                    String::new()
                };
                second = self.scan_next();
            }

            let breaks = self.line_breaks > 0;
            match second {
                SyntaxKind::CloseBrace | SyntaxKind::CloseBracket => {
                    let opener = if second == SyntaxKind::CloseBrace {
                        SyntaxKind::OpenBrace
                    } else {
                        SyntaxKind::OpenBracket
                    };
                    if first != opener {
                        self.level = self.level.saturating_sub(1);
                    }
                    if (self.keep_lines && breaks) || (!self.keep_lines && first != opener) {
                        replace = self.newlines_and_indent();
                    } else if self.keep_lines {
                        replace = " ".to_string();
                    }
                }
                _ => {
                    match first {
                        SyntaxKind::OpenBracket | SyntaxKind::OpenBrace => {
                            self.level += 1;
                            replace = if (self.keep_lines && breaks) || !self.keep_lines {
                                self.newlines_and_indent()
                            } else {
                                " ".to_string()
                            };
                        }
                        SyntaxKind::Comma => {
                            replace = if (self.keep_lines && breaks) || !self.keep_lines {
                                self.newlines_and_indent()
                            } else {
                                " ".to_string()
                            };
                        }
                        SyntaxKind::LineComment => {
                            replace = self.newlines_and_indent();
                        }
                        SyntaxKind::BlockComment => {
                            if breaks {
                                replace = self.newlines_and_indent();
                            } else if !needs_line_break {
                                replace = " ".to_string();
                            }
                        }
                        SyntaxKind::Colon => {
                            if self.keep_lines && breaks {
                                replace = self.newlines_and_indent();
                            } else if !needs_line_break {
                                replace = " ".to_string();
                            }
                        }
                        SyntaxKind::String => {
                            if self.keep_lines && breaks {
                                replace = self.newlines_and_indent();
                            } else if second == SyntaxKind::Colon && !needs_line_break {
                                replace = String::new();
                            }
                        }
                        SyntaxKind::Null
                        | SyntaxKind::True
                        | SyntaxKind::False
                        | SyntaxKind::Number
                        | SyntaxKind::CloseBrace
                        | SyntaxKind::CloseBracket => {
                            if self.keep_lines && breaks {
                                replace = self.newlines_and_indent();
                            } else if matches!(
                                second,
                                SyntaxKind::LineComment | SyntaxKind::BlockComment
                            ) && !needs_line_break
                            {
                                replace = " ".to_string();
                            } else if second != SyntaxKind::Comma && second != SyntaxKind::Eof {
                                self.has_error = true;
                            }
                        }
                        SyntaxKind::Unknown => self.has_error = true,
                        _ => {}
                    }
                    if breaks && matches!(second, SyntaxKind::LineComment | SyntaxKind::BlockComment) {
                        replace = self.newlines_and_indent();
                    }
                }
            }

            if second == SyntaxKind::Eof {
                replace = if self.keep_lines && breaks {
                    self.newlines_and_indent()
                } else if insert_final_newline {
                    self.eol.clone()
                } else {
                    String::new()
                };
            }

            let second_start = self.token_start();
            self.add_edit(replace, first_end, second_start);
            first = second;
        }
    }
}
