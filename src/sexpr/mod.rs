//! DjVu S-expression tree model.
//!
//! DjVu stores both the document outline (`bookmarks`) and the per-page hidden
//! text layout (`page`, `column`, `para`, `line`, `word`, ...) as
//! S-expressions. This module defines the immutable tree, a parser for the
//! textual syntax printed by djvulibre, and the generic visitor that the
//! outline and text walkers are built on.
//!
//! # Example
//!
//! ```
//! use djvu2pdf::sexpr::{self, SExpr};
//!
//! let node = sexpr::parse(br##"(bookmarks ("Chapter 2" "#100"))"##).unwrap();
//! assert_eq!(node.tag(), Some("bookmarks"));
//! assert_eq!(node.to_string(), r##"(bookmarks ("Chapter 2" "#100"))"##);
//! ```

mod parser;
pub mod visitor;

pub use parser::{parse, parse_all, MAX_DEPTH};
pub use visitor::{Handlers, IntegerHandler, ListHandler, SExprVisitor, StringHandler};

use std::fmt;
use std::str::Utf8Error;

/// A node of a DjVu S-expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SExpr {
    /// Integer literal (coordinates, counts).
    Integer(i64),

    /// String literal as raw bytes.
    ///
    /// Decoding to text happens lazily in the consumers because real-world
    /// documents contain malformed UTF-8 in titles and hidden text.
    String(Vec<u8>),

    /// Identifier, meaningful only as the leading tag of a list.
    Symbol(String),

    /// Ordered list of child nodes, possibly empty.
    List(Vec<SExpr>),
}

impl SExpr {
    /// Create a string node.
    pub fn string(value: impl Into<Vec<u8>>) -> Self {
        SExpr::String(value.into())
    }

    /// Create a symbol node.
    pub fn symbol(name: impl Into<String>) -> Self {
        SExpr::Symbol(name.into())
    }

    /// Create a list node.
    pub fn list(items: impl IntoIterator<Item = SExpr>) -> Self {
        SExpr::List(items.into_iter().collect())
    }

    /// Create a tagged list `(tag items...)`.
    pub fn tagged(tag: impl Into<String>, items: impl IntoIterator<Item = SExpr>) -> Self {
        let mut list = vec![SExpr::Symbol(tag.into())];
        list.extend(items);
        SExpr::List(list)
    }

    /// Get the integer value, if this is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SExpr::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Get the raw bytes, if this is a string.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            SExpr::String(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Get the symbol name, if this is a symbol.
    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            SExpr::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// Get the children, if this is a list.
    pub fn as_list(&self) -> Option<&[SExpr]> {
        match self {
            SExpr::List(items) => Some(items),
            _ => None,
        }
    }

    /// Decode a string node as UTF-8.
    ///
    /// Returns `None` for non-string nodes.
    pub fn decode_str(&self) -> Option<Result<&str, Utf8Error>> {
        self.as_bytes().map(std::str::from_utf8)
    }

    /// Leading symbol of a tagged list.
    pub fn tag(&self) -> Option<&str> {
        self.as_list()
            .and_then(|items| items.first())
            .and_then(SExpr::as_symbol)
    }

    /// Check if this is a string node.
    pub fn is_string(&self) -> bool {
        matches!(self, SExpr::String(_))
    }
}

impl From<i64> for SExpr {
    fn from(value: i64) -> Self {
        SExpr::Integer(value)
    }
}

impl From<&str> for SExpr {
    fn from(value: &str) -> Self {
        SExpr::String(value.as_bytes().to_vec())
    }
}

impl fmt::Display for SExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SExpr::Integer(value) => write!(f, "{}", value),
            SExpr::String(bytes) => write_string(f, bytes),
            SExpr::Symbol(name) => write_symbol(f, name),
            SExpr::List(items) => write!(f, "{}", ListDisplay(items)),
        }
    }
}

/// Displays a slice of nodes as a parenthesized list.
///
/// Handlers receive their list as a slice; this prints it in diagnostics
/// without rebuilding an owned `SExpr::List`.
pub struct ListDisplay<'a>(pub &'a [SExpr]);

impl fmt::Display for ListDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, item) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", item)?;
        }
        f.write_str(")")
    }
}

fn write_string(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    match std::str::from_utf8(bytes) {
        Ok(text) => {
            for c in text.chars() {
                match c {
                    '"' => f.write_str("\\\"")?,
                    '\\' => f.write_str("\\\\")?,
                    '\n' => f.write_str("\\n")?,
                    '\t' => f.write_str("\\t")?,
                    '\r' => f.write_str("\\r")?,
                    c if c.is_ascii_control() => write!(f, "\\{:03o}", c as u32)?,
                    c => write!(f, "{}", c)?,
                }
            }
        }
        Err(_) => {
            for &byte in bytes {
                match byte {
                    b'"' => f.write_str("\\\"")?,
                    b'\\' => f.write_str("\\\\")?,
                    b'\n' => f.write_str("\\n")?,
                    b'\t' => f.write_str("\\t")?,
                    b'\r' => f.write_str("\\r")?,
                    0x20..=0x7e => write!(f, "{}", byte as char)?,
                    _ => write!(f, "\\{:03o}", byte)?,
                }
            }
        }
    }
    f.write_str("\"")
}

fn write_symbol(f: &mut fmt::Formatter<'_>, name: &str) -> fmt::Result {
    if is_bare_symbol(name) {
        f.write_str(name)
    } else {
        write!(f, "|{}|", name)
    }
}

/// A symbol can be printed without `|...|` quoting when the parser would read
/// it back as the same symbol.
fn is_bare_symbol(name: &str) -> bool {
    !name.is_empty()
        && !parser::looks_like_integer(name.as_bytes())
        && name
            .bytes()
            .all(|b| !b.is_ascii_whitespace() && !matches!(b, b'(' | b')' | b'"' | b';' | b'|'))
}
