//! Tokenizer for JSON with comments
//!
//! Produces every token including whitespace, line breaks and comments so the
//! formatter can reason about the trivia between structural tokens.

/// Token kinds produced by [`Scanner::scan`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxKind {
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
    Comma,
    Colon,
    Null,
    True,
    False,
    String,
    Number,
    LineComment,
    BlockComment,
    LineBreak,
    Trivia,
    Unknown,
    Eof,
}

impl SyntaxKind {
    /// Whitespace, line breaks and comments.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::Trivia | Self::LineBreak | Self::LineComment | Self::BlockComment
        )
    }
}

/// Problems found while scanning the most recent token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanError {
    None,
    UnexpectedEndOfComment,
    UnexpectedEndOfString,
    UnexpectedEndOfNumber,
    InvalidUnicode,
    InvalidEscapeCharacter,
    InvalidCharacter,
}

/// Byte order mark some editors write at the start of UTF-8 files.
pub(crate) const BOM: &str = "\u{feff}";

/// A resumable scanner over a JSONC document.
///
/// Offsets are byte offsets into the scanned text.
pub struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    token: SyntaxKind,
    token_offset: usize,
    value: String,
    error: ScanError,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            token: SyntaxKind::Unknown,
            token_offset: 0,
            value: String::new(),
            error: ScanError::None,
        }
    }

    pub fn token(&self) -> SyntaxKind {
        self.token
    }

    pub fn token_offset(&self) -> usize {
        self.token_offset
    }

    pub fn token_length(&self) -> usize {
        self.pos - self.token_offset
    }

    pub fn token_end(&self) -> usize {
        self.pos
    }

    /// Decoded value of the last string token, or the raw text of other tokens.
    pub fn token_value(&self) -> &str {
        &self.value
    }

    pub fn error(&self) -> ScanError {
        self.error
    }

    /// Scan the next token.
    pub fn scan(&mut self) -> SyntaxKind {
        self.value.clear();
        self.error = ScanError::None;
        self.token_offset = self.pos;
        self.token = self.scan_next();
        self.token
    }

    fn peek(&self, at: usize) -> Option<u8> {
        self.bytes.get(at).copied()
    }

    fn scan_next(&mut self) -> SyntaxKind {
        let Some(ch) = self.peek(self.pos) else {
            return SyntaxKind::Eof;
        };

        if self.pos == 0 && self.text.starts_with(BOM) {
            self.pos = BOM.len();
        }
        if self.pos > self.token_offset || is_whitespace(ch) {
            while self.peek(self.pos).is_some_and(is_whitespace) {
                self.pos += 1;
            }
            self.value.push_str(&self.text[self.token_offset..self.pos]);
            return SyntaxKind::Trivia;
        }

        if ch == b'\r' || ch == b'\n' {
            self.pos += 1;
            if ch == b'\r' && self.peek(self.pos) == Some(b'\n') {
                self.pos += 1;
            }
            self.value.push_str(&self.text[self.token_offset..self.pos]);
            return SyntaxKind::LineBreak;
        }

        match ch {
            b'{' => self.single(SyntaxKind::OpenBrace),
            b'}' => self.single(SyntaxKind::CloseBrace),
            b'[' => self.single(SyntaxKind::OpenBracket),
            b']' => self.single(SyntaxKind::CloseBracket),
            b':' => self.single(SyntaxKind::Colon),
            b',' => self.single(SyntaxKind::Comma),
            b'"' => {
                self.pos += 1;
                self.scan_string();
                SyntaxKind::String
            }
            b'/' => self.scan_comment(),
            b'-' => {
                self.pos += 1;
                if !self.peek(self.pos).is_some_and(|c| c.is_ascii_digit()) {
                    self.value.push('-');
                    return SyntaxKind::Unknown;
                }
                self.scan_number();
                self.value = self.text[self.token_offset..self.pos].to_string();
                SyntaxKind::Number
            }
            b'0'..=b'9' => {
                self.scan_number();
                self.value = self.text[self.token_offset..self.pos].to_string();
                SyntaxKind::Number
            }
            _ => self.scan_word(),
        }
    }

    fn single(&mut self, kind: SyntaxKind) -> SyntaxKind {
        self.pos += 1;
        kind
    }

    fn scan_comment(&mut self) -> SyntaxKind {
        match self.peek(self.pos + 1) {
            Some(b'/') => {
                self.pos += 2;
                while let Some(c) = self.peek(self.pos) {
                    if c == b'\r' || c == b'\n' {
                        break;
                    }
                    self.pos += 1;
                }
                self.value.push_str(&self.text[self.token_offset..self.pos]);
                SyntaxKind::LineComment
            }
            Some(b'*') => {
                self.pos += 2;
                let mut closed = false;
                while let Some(c) = self.peek(self.pos) {
                    if c == b'*' && self.peek(self.pos + 1) == Some(b'/') {
                        self.pos += 2;
                        closed = true;
                        break;
                    }
                    self.pos += 1;
                }
                if !closed {
                    self.error = ScanError::UnexpectedEndOfComment;
                }
                self.value.push_str(&self.text[self.token_offset..self.pos]);
                SyntaxKind::BlockComment
            }
            _ => {
                self.pos += 1;
                self.value.push('/');
                SyntaxKind::Unknown
            }
        }
    }

    fn scan_number(&mut self) {
        let start = self.pos;
        if self.peek(self.pos) == Some(b'0') {
            self.pos += 1;
        } else {
            self.skip_digits();
        }
        if self.peek(self.pos) == Some(b'.') {
            if self.peek(self.pos + 1).is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
                self.skip_digits();
            } else {
                self.error = ScanError::UnexpectedEndOfNumber;
                return;
            }
        }
        if matches!(self.peek(self.pos), Some(b'e' | b'E')) {
            let mut end = self.pos + 1;
            if matches!(self.peek(end), Some(b'+' | b'-')) {
                end += 1;
            }
            if self.peek(end).is_some_and(|c| c.is_ascii_digit()) {
                self.pos = end;
                self.skip_digits();
            } else {
                self.error = ScanError::UnexpectedEndOfNumber;
            }
        }
        debug_assert!(self.pos > start);
    }

    fn skip_digits(&mut self) {
        while self.peek(self.pos).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
    }

    fn scan_string(&mut self) {
        let mut start = self.pos;
        loop {
            let Some(ch) = self.peek(self.pos) else {
                self.value.push_str(&self.text[start..self.pos]);
                self.error = ScanError::UnexpectedEndOfString;
                return;
            };
            match ch {
                b'"' => {
                    self.value.push_str(&self.text[start..self.pos]);
                    self.pos += 1;
                    return;
                }
                b'\\' => {
                    self.value.push_str(&self.text[start..self.pos]);
                    self.pos += 1;
                    self.scan_escape();
                    start = self.pos;
                }
                b'\r' | b'\n' => {
                    self.value.push_str(&self.text[start..self.pos]);
                    self.error = ScanError::UnexpectedEndOfString;
                    return;
                }
                0x00..=0x1f => {
                    self.error = ScanError::InvalidCharacter;
                    self.pos += 1;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn scan_escape(&mut self) {
        let Some(ch) = self.peek(self.pos) else {
            self.error = ScanError::UnexpectedEndOfString;
            return;
        };
        self.pos += 1;
        match ch {
            b'"' => self.value.push('"'),
            b'\\' => self.value.push('\\'),
            b'/' => self.value.push('/'),
            b'b' => self.value.push('\u{8}'),
            b'f' => self.value.push('\u{c}'),
            b'n' => self.value.push('\n'),
            b'r' => self.value.push('\r'),
            b't' => self.value.push('\t'),
            b'u' => match self.scan_hex4() {
                Some(high @ 0xD800..=0xDBFF) => {
                    let low = if self.peek(self.pos) == Some(b'\\')
                        && self.peek(self.pos + 1) == Some(b'u')
                    {
                        self.pos += 2;
                        self.scan_hex4()
                    } else {
                        None
                    };
                    match low {
                        Some(low @ 0xDC00..=0xDFFF) => {
                            let code = 0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00);
                            self.push_code_point(code);
                        }
                        _ => self.error = ScanError::InvalidUnicode,
                    }
                }
                Some(code) => self.push_code_point(code),
                None => self.error = ScanError::InvalidUnicode,
            },
            _ => self.error = ScanError::InvalidEscapeCharacter,
        }
    }

    fn scan_hex4(&mut self) -> Option<u32> {
        let digits = self.text.get(self.pos..self.pos + 4)?;
        let code = u32::from_str_radix(digits, 16).ok()?;
        self.pos += 4;
        Some(code)
    }

    fn push_code_point(&mut self, code: u32) {
        match char::from_u32(code) {
            Some(c) => self.value.push(c),
            None => self.error = ScanError::InvalidUnicode,
        }
    }

    fn scan_word(&mut self) -> SyntaxKind {
        while self.peek(self.pos).is_some_and(is_unknown_content) {
            self.pos += 1;
        }
        if self.pos == self.token_offset {
            // A lone non-ASCII or control character; step over the whole char
            let width = self.text[self.pos..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            self.pos += width;
            self.value.push_str(&self.text[self.token_offset..self.pos]);
            return SyntaxKind::Unknown;
        }
        self.value.push_str(&self.text[self.token_offset..self.pos]);
        match self.value.as_str() {
            "true" => SyntaxKind::True,
            "false" => SyntaxKind::False,
            "null" => SyntaxKind::Null,
            _ => SyntaxKind::Unknown,
        }
    }
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | 0x0b | 0x0c)
}

fn is_unknown_content(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_' || ch == b'$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<SyntaxKind> {
        let mut scanner = Scanner::new(text);
        let mut out = Vec::new();
        loop {
            let kind = scanner.scan();
            out.push(kind);
            if kind == SyntaxKind::Eof {
                break;
            }
        }
        out
    }

    #[test]
    fn leading_byte_order_mark_is_trivia() {
        use SyntaxKind::*;
        let text = "\u{feff} {}";
        let mut scanner = Scanner::new(text);
        assert_eq!(scanner.scan(), Trivia);
        assert_eq!(scanner.token_length(), 4);
        assert_eq!(scanner.scan(), OpenBrace);
        assert_eq!(scanner.token_offset(), 4);
        assert_eq!(kinds(text), vec![Trivia, OpenBrace, CloseBrace, Eof]);
    }

    #[test]
    fn scans_structural_tokens() {
        use SyntaxKind::*;
        assert_eq!(
            kinds(r#"{"a":[1,true,null]}"#),
            vec![
                OpenBrace,
                String,
                Colon,
                OpenBracket,
                Number,
                Comma,
                True,
                Comma,
                Null,
                CloseBracket,
                CloseBrace,
                Eof
            ]
        );
    }

    #[test]
    fn scans_comments_and_line_breaks() {
        use SyntaxKind::*;
        assert_eq!(
            kinds("// one\r\n/* two */ 3"),
            vec![LineComment, LineBreak, BlockComment, Trivia, Number, Eof]
        );
    }

    #[test]
    fn decodes_string_escapes() {
        let mut scanner = Scanner::new(r#""a\"b\né😀""#);
        assert_eq!(scanner.scan(), SyntaxKind::String);
        assert_eq!(scanner.token_value(), "a\"b\né😀");
        assert_eq!(scanner.error(), ScanError::None);
    }

    #[test]
    fn reports_unterminated_block_comment() {
        let mut scanner = Scanner::new("/* open");
        assert_eq!(scanner.scan(), SyntaxKind::BlockComment);
        assert_eq!(scanner.error(), ScanError::UnexpectedEndOfComment);
    }

    #[test]
    fn reports_unterminated_string() {
        let mut scanner = Scanner::new("\"abc\n");
        assert_eq!(scanner.scan(), SyntaxKind::String);
        assert_eq!(scanner.error(), ScanError::UnexpectedEndOfString);
    }

    #[test]
    fn scans_negative_and_exponent_numbers() {
        let mut scanner = Scanner::new("-12.5e+3");
        assert_eq!(scanner.scan(), SyntaxKind::Number);
        assert_eq!(scanner.token_value(), "-12.5e+3");
        assert_eq!(scanner.token_length(), 8);
    }

    #[test]
    fn unknown_words_are_unknown_tokens() {
        let mut scanner = Scanner::new("undefined");
        assert_eq!(scanner.scan(), SyntaxKind::Unknown);
        assert_eq!(scanner.token_value(), "undefined");
    }
}
