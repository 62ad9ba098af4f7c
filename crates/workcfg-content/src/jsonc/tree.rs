//! Offset-carrying syntax tree for JSONC documents

use serde_json::{Map, Number, Value};

use super::scanner::{ScanError, Scanner, SyntaxKind};
use crate::error::{Error, Result};
use crate::path::PathSegment;

const FORMAT: &str = "JSONC";

/// Kind of a [`Node`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Object,
    Array,
    Property,
    String,
    Number,
    Boolean,
    Null,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::Property => "property",
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

/// A node in a parsed JSONC document.
///
/// `offset` and `length` cover the node's text. A property spans from the
/// start of its key to the end of its value and has exactly two children,
/// the key and the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub offset: usize,
    pub length: usize,
    pub children: Vec<Node>,
    pub value: Option<Value>,
}

impl Node {
    fn leaf(kind: NodeKind, offset: usize, length: usize, value: Value) -> Self {
        Self {
            kind,
            offset,
            length,
            children: Vec::new(),
            value: Some(value),
        }
    }

    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Key of a property node.
    pub fn key(&self) -> Option<&str> {
        if self.kind != NodeKind::Property {
            return None;
        }
        self.children.first()?.value.as_ref()?.as_str()
    }

    /// Value node of a property node.
    pub fn property_value(&self) -> Option<&Node> {
        if self.kind != NodeKind::Property {
            return None;
        }
        self.children.get(1)
    }

    /// Convert this node into a plain JSON value.
    pub fn to_value(&self) -> Value {
        match self.kind {
            NodeKind::Object => {
                let mut map = Map::new();
                for property in &self.children {
                    if let (Some(key), Some(value)) = (property.key(), property.property_value()) {
                        map.insert(key.to_string(), value.to_value());
                    }
                }
                Value::Object(map)
            }
            NodeKind::Array => Value::Array(self.children.iter().map(Node::to_value).collect()),
            NodeKind::Property => self
                .property_value()
                .map_or(Value::Null, Node::to_value),
            _ => self.value.clone().unwrap_or(Value::Null),
        }
    }
}

/// Find the node addressed by `path`, starting at `root`.
///
/// Keys descend into object properties, indexes into array elements. An
/// append segment never addresses an existing node.
pub fn find_node_at_location<'n>(root: &'n Node, path: &[PathSegment]) -> Option<&'n Node> {
    let mut node = root;
    for segment in path {
        node = match segment {
            PathSegment::Key(key) => {
                if node.kind != NodeKind::Object {
                    return None;
                }
                node.children
                    .iter()
                    .find(|p| p.key() == Some(key.as_str()))?
                    .property_value()?
            }
            PathSegment::Index(index) => {
                if node.kind != NodeKind::Array {
                    return None;
                }
                node.children.get(*index)?
            }
            PathSegment::Append => return None,
        };
    }
    Some(node)
}

/// Parse a JSONC document into a tree.
///
/// Comments and trailing commas are accepted. Returns `None` for a document
/// that holds only whitespace and comments.
pub fn parse_tree(text: &str) -> Result<Option<Node>> {
    let mut parser = Parser {
        scanner: Scanner::new(text),
    };
    let token = parser.advance()?;
    if token == SyntaxKind::Eof {
        return Ok(None);
    }
    let root = parser.parse_value(token)?;
    match parser.advance()? {
        SyntaxKind::Eof => Ok(Some(root)),
        _ => Err(parser.error("End of file expected")),
    }
}

/// Parse a JSONC document into a plain JSON value.
///
/// An empty document parses to `null`.
pub fn parse_value(text: &str) -> Result<Value> {
    Ok(parse_tree(text)?.map_or(Value::Null, |node| node.to_value()))
}

struct Parser<'a> {
    scanner: Scanner<'a>,
}

impl Parser<'_> {
    fn error(&self, message: &str) -> Error {
        Error::parse(
            FORMAT,
            format!("{} at offset {}", message, self.scanner.token_offset()),
        )
    }

    /// Next non-trivia token.
    fn advance(&mut self) -> Result<SyntaxKind> {
        loop {
            let token = self.scanner.scan();
            let message = match self.scanner.error() {
                ScanError::None => None,
                ScanError::UnexpectedEndOfComment => Some("Unexpected end of comment"),
                ScanError::UnexpectedEndOfString => Some("Unexpected end of string"),
                ScanError::UnexpectedEndOfNumber => Some("Unexpected end of number"),
                ScanError::InvalidUnicode => Some("Invalid unicode sequence"),
                ScanError::InvalidEscapeCharacter => Some("Invalid escape character"),
                ScanError::InvalidCharacter => Some("Invalid character"),
            };
            if let Some(message) = message {
                return Err(self.error(message));
            }
            if !token.is_trivia() {
                return Ok(token);
            }
        }
    }

    fn parse_value(&mut self, token: SyntaxKind) -> Result<Node> {
        let offset = self.scanner.token_offset();
        let length = self.scanner.token_length();
        match token {
            SyntaxKind::OpenBrace => self.parse_object(offset),
            SyntaxKind::OpenBracket => self.parse_array(offset),
            SyntaxKind::String => Ok(Node::leaf(
                NodeKind::String,
                offset,
                length,
                Value::String(self.scanner.token_value().to_string()),
            )),
            SyntaxKind::Number => {
                let number: Number = self
                    .scanner
                    .token_value()
                    .parse()
                    .map_err(|_| self.error("Invalid number"))?;
                Ok(Node::leaf(NodeKind::Number, offset, length, Value::Number(number)))
            }
            SyntaxKind::True => Ok(Node::leaf(NodeKind::Boolean, offset, length, Value::Bool(true))),
            SyntaxKind::False => Ok(Node::leaf(NodeKind::Boolean, offset, length, Value::Bool(false))),
            SyntaxKind::Null => Ok(Node::leaf(NodeKind::Null, offset, length, Value::Null)),
            _ => Err(self.error("Value expected")),
        }
    }

    fn parse_object(&mut self, offset: usize) -> Result<Node> {
        let mut children = Vec::new();
        let mut token = self.advance()?;
        loop {
            match token {
                SyntaxKind::CloseBrace => break,
                SyntaxKind::String => {
                    let key = Node::leaf(
                        NodeKind::String,
                        self.scanner.token_offset(),
                        self.scanner.token_length(),
                        Value::String(self.scanner.token_value().to_string()),
                    );
                    if self.advance()? != SyntaxKind::Colon {
                        return Err(self.error("Colon expected"));
                    }
                    let value_token = self.advance()?;
                    let value = self.parse_value(value_token)?;
                    children.push(Node {
                        kind: NodeKind::Property,
                        offset: key.offset,
                        length: value.end() - key.offset,
                        children: vec![key, value],
                        value: None,
                    });

                    token = self.advance()?;
                    match token {
                        SyntaxKind::Comma => token = self.advance()?,
                        SyntaxKind::CloseBrace => {}
                        _ => return Err(self.error("Comma or closing brace expected")),
                    }
                }
                _ => return Err(self.error("Property name expected")),
            }
        }
        Ok(Node {
            kind: NodeKind::Object,
            offset,
            length: self.scanner.token_end() - offset,
            children,
            value: None,
        })
    }

    fn parse_array(&mut self, offset: usize) -> Result<Node> {
        let mut children = Vec::new();
        let mut token = self.advance()?;
        while token != SyntaxKind::CloseBracket {
            children.push(self.parse_value(token)?);
            token = self.advance()?;
            match token {
                SyntaxKind::Comma => token = self.advance()?,
                SyntaxKind::CloseBracket => {}
                _ => return Err(self.error("Comma or closing bracket expected")),
            }
        }
        Ok(Node {
            kind: NodeKind::Array,
            offset,
            length: self.scanner.token_end() - offset,
            children,
            value: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_comments_and_trailing_commas() {
        let text = "{\n\t// name\n\t\"name\": \"w\",\n\t\"ids\": [1, 2,],\n}";
        assert_eq!(parse_value(text).unwrap(), json!({"name": "w", "ids": [1, 2]}));
    }

    #[test]
    fn records_property_offsets() {
        let text = r#"{"a": [1, {"b": true}]}"#;
        let root = parse_tree(text).unwrap().unwrap();
        assert_eq!((root.offset, root.length), (0, text.len()));

        let property = &root.children[0];
        assert_eq!(&text[property.offset..property.end()], r#""a": [1, {"b": true}]"#);

        let b = find_node_at_location(
            &root,
            &[
                PathSegment::key("a"),
                PathSegment::Index(1),
                PathSegment::key("b"),
            ],
        )
        .unwrap();
        assert_eq!(&text[b.offset..b.end()], "true");
    }

    #[test]
    fn missing_locations_are_none() {
        let root = parse_tree(r#"{"a": []}"#).unwrap().unwrap();
        assert!(find_node_at_location(&root, &[PathSegment::key("b")]).is_none());
        assert!(find_node_at_location(&root, &[PathSegment::key("a"), PathSegment::Index(0)]).is_none());
        assert!(find_node_at_location(&root, &[PathSegment::key("a"), PathSegment::Append]).is_none());
    }

    #[test]
    fn empty_document_has_no_root() {
        assert!(parse_tree("  // nothing here\n").unwrap().is_none());
        assert_eq!(parse_value("").unwrap(), Value::Null);
    }

    #[test]
    fn rejects_missing_commas() {
        let err = parse_value(r#"{"a": 1 "b": 2}"#).unwrap_err();
        assert!(err.to_string().contains("Comma or closing brace expected"));
    }

    #[test]
    fn rejects_trailing_garbage() {
        assert!(parse_value("{} {}").is_err());
    }

    #[test]
    fn preserves_key_order() {
        let value = parse_value(r#"{"z": 1, "a": 2, "m": 3}"#).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }
}
