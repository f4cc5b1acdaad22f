//! Plain-text extraction from a hidden-text layout tree.

use super::layout::{LayoutKind, LayoutNode};
use crate::sexpr::{Handlers, ListDisplay, SExpr, SExprVisitor};
use unicode_general_category::{get_general_category, GeneralCategory};

/// Number of spaces a tab expands to.
pub const TAB_SIZE: usize = 4;

/// Make text drawable by a PDF text renderer.
///
/// A tab becomes [`TAB_SIZE`] spaces and a newline becomes one space. Plain
/// ASCII spaces are kept. Every other control, format, private-use,
/// surrogate or separator character is dropped.
pub fn filter_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => out.extend(std::iter::repeat(' ').take(TAB_SIZE)),
            '\n' | ' ' => out.push(' '),
            c if is_undrawable(c) => {}
            c => out.push(c),
        }
    }
    out
}

/// Whether `c` belongs to a general category the renderer cannot draw.
pub fn is_undrawable(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::PrivateUse
            | GeneralCategory::Surrogate
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
            | GeneralCategory::SpaceSeparator
    )
}

/// Visitor turning a layout tree into plain text.
///
/// Words yield their filtered content, lines join their children with a
/// space, and paragraphs, columns, regions and pages join with a newline.
pub struct TextExtractor {
    handlers: Handlers<Self>,
}

impl TextExtractor {
    /// Create an extractor.
    pub fn new() -> Self {
        let handlers = Handlers::<Self>::new()
            .on_string(Self::visit_string)
            .on_plain_list(Self::visit_plain_list)
            .on_tags(LayoutKind::Word.tags(), Self::visit_word)
            .on_tags(LayoutKind::Line.tags(), Self::visit_joined)
            .on_tags(LayoutKind::Paragraph.tags(), Self::visit_joined)
            .on_tags(LayoutKind::Column.tags(), Self::visit_joined)
            .on_tags(LayoutKind::Page.tags(), Self::visit_joined);
        Self { handlers }
    }

    /// Extract the text of any node; unrecognized nodes yield `""`.
    pub fn extract(&mut self, node: &SExpr) -> String {
        self.visit(node, ()).unwrap_or_default()
    }

    fn visit_string(&mut self, bytes: &[u8], _: ()) -> Option<String> {
        match std::str::from_utf8(bytes) {
            Ok(text) => Some(filter_text(text)),
            Err(err) => {
                log::warn!(
                    "Could not decode text \"{}\": {}",
                    bytes.escape_ascii(),
                    err
                );
                Some(String::new())
            }
        }
    }

    fn visit_plain_list(&mut self, _: &[SExpr], _: ()) -> Option<String> {
        Some(String::new())
    }

    fn visit_word(&mut self, items: &[SExpr], _: ()) -> Option<String> {
        let Some(node) = LayoutNode::from_items(items) else {
            log::warn!("Malformed text layout {}", ListDisplay(items));
            return None;
        };
        match node.content() {
            Some(content) => self.visit(content, ()),
            None => {
                log::warn!("Word without content {}", ListDisplay(items));
                None
            }
        }
    }

    fn visit_joined(&mut self, items: &[SExpr], _: ()) -> Option<String> {
        let Some(node) = LayoutNode::from_items(items) else {
            log::warn!("Malformed text layout {}", ListDisplay(items));
            return None;
        };
        let parts: Vec<String> = node
            .children
            .iter()
            .map(|child| self.visit(child, ()).unwrap_or_default())
            .collect();
        Some(parts.join(node.kind.separator()))
    }
}

impl Default for TextExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SExprVisitor for TextExtractor {
    type Context = ();
    type Output = String;

    fn handlers(&self) -> &Handlers<Self> {
        &self.handlers
    }
}

/// Extract the plain text of one page layout tree.
pub fn extract_page_text(page: &SExpr) -> String {
    TextExtractor::new().extract(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sexpr::parse;

    fn extract(input: &str) -> String {
        extract_page_text(&parse(input.as_bytes()).unwrap())
    }

    #[test]
    fn test_filter_text() {
        assert_eq!(filter_text("a\tb"), "a    b");
        assert_eq!(filter_text("a\nb"), "a b");
        assert_eq!(filter_text("a b"), "a b");
        assert_eq!(filter_text("soft\u{ad}hyphen"), "softhyphen");
        assert_eq!(filter_text("nb\u{a0}sp"), "nbsp");
        assert_eq!(filter_text("zero\u{200b}width"), "zerowidth");
        assert_eq!(filter_text("\u{e000}private"), "private");
        assert_eq!(filter_text("line\u{2028}sep\u{2029}"), "linesep");
        assert_eq!(filter_text("bell\u{7}\r"), "bell");
        assert_eq!(filter_text("Привет, мир"), "Привет, мир");
    }

    #[test]
    fn test_filtered_text_has_no_undrawable_chars() {
        let filtered = filter_text("a\u{0}b\u{1f}c\u{feff}d\u{3000}e\u{85}f\u{2009}");
        assert!(filtered.chars().all(|c| c == ' ' || !is_undrawable(c)));
        assert_eq!(filtered, "abcdef");
    }

    #[test]
    fn test_word() {
        assert_eq!(extract(r#"(word 0 0 10 10 "Hello")"#), "Hello");
        assert_eq!(extract(r#"(char 0 0 10 10 "H")"#), "H");
    }

    #[test]
    fn test_line_join() {
        assert_eq!(extract("(line 0 0 10 10)"), "");
        assert_eq!(
            extract(r#"(line 0 0 100 10 (word 0 0 40 10 "Hello") (word 50 0 100 10 "world"))"#),
            "Hello world"
        );
    }

    #[test]
    fn test_block_join() {
        let page = r#"
            (page 0 0 1000 1000
              (column 0 0 1000 1000
                (para 0 0 1000 500
                  (line 0 400 1000 500 (word 0 400 100 500 "one") (word 200 400 300 500 "two"))
                  (line 0 300 1000 400 (word 0 300 100 400 "three")))
                (region 0 500 1000 1000
                  (paragraph 0 500 1000 1000
                    (line 0 900 1000 1000 (word 0 900 100 1000 "four"))))))
        "#;
        assert_eq!(extract(page), "one two\nthree\nfour");
    }

    #[test]
    fn test_failed_child_contributes_empty_string() {
        assert_eq!(
            extract(r#"(line 0 0 10 10 (word 0 0 5 5 "a") (zone 1 2 3 4) (word 6 0 9 5 "b"))"#),
            "a  b"
        );
        assert_eq!(extract(r#"(line 0 0 10 10 (word 0 0 5 5 "a") ("junk"))"#), "a ");
    }

    #[test]
    fn test_malformed_utf8_yields_empty_string() {
        let mut extractor = TextExtractor::new();
        assert_eq!(
            extractor.visit(&SExpr::string(vec![0xff, 0xfe, 0x41]), ()),
            Some(String::new())
        );
    }

    #[test]
    fn test_malformed_layout_yields_nothing() {
        let mut extractor = TextExtractor::new();
        let node = parse(br#"(word 0 0 "x")"#).unwrap();
        assert_eq!(extractor.visit(&node, ()), None);
        assert_eq!(extractor.extract(&node), "");
    }

    #[test]
    fn test_tabs_inside_words() {
        assert_eq!(extract(r#"(word 0 0 10 10 "a\tb\nc")"#), "a    b c");
    }
}
