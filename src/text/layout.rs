//! Typed view over DjVu hidden-text layout lists.
//!
//! Every layout list has the shape `(kind x1 y1 x2 y2 children...)` where the
//! coordinates are page units with the origin at the bottom-left corner.

use crate::sexpr::SExpr;
use serde::Serialize;

/// Granularity of a layout node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    /// Whole page (`page`)
    Page,
    /// Column or region (`column`, `region`)
    Column,
    /// Paragraph (`para`, `paragraph`)
    Paragraph,
    /// Line (`line`)
    Line,
    /// Word or single character (`word`, `char`)
    Word,
}

impl LayoutKind {
    /// Map a DjVu tag to its kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "page" => Some(LayoutKind::Page),
            "column" | "region" => Some(LayoutKind::Column),
            "para" | "paragraph" => Some(LayoutKind::Paragraph),
            "line" => Some(LayoutKind::Line),
            "word" | "char" => Some(LayoutKind::Word),
            _ => None,
        }
    }

    /// All tags denoting this kind.
    pub fn tags(self) -> &'static [&'static str] {
        match self {
            LayoutKind::Page => &["page"],
            LayoutKind::Column => &["column", "region"],
            LayoutKind::Paragraph => &["para", "paragraph"],
            LayoutKind::Line => &["line"],
            LayoutKind::Word => &["word", "char"],
        }
    }

    /// Separator placed between the texts of the children.
    pub fn separator(self) -> &'static str {
        match self {
            LayoutKind::Word => "",
            LayoutKind::Line => " ",
            LayoutKind::Page | LayoutKind::Column | LayoutKind::Paragraph => "\n",
        }
    }
}

/// Bounding box in page units, origin bottom-left, y up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BBox {
    pub x1: i64,
    pub y1: i64,
    pub x2: i64,
    pub y2: i64,
}

impl BBox {
    /// Create a bounding box.
    pub fn new(x1: i64, y1: i64, x2: i64, y2: i64) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Horizontal extent; negative for inverted boxes.
    pub fn width(&self) -> i64 {
        self.x2.saturating_sub(self.x1)
    }

    /// Vertical extent; negative for inverted boxes.
    pub fn height(&self) -> i64 {
        self.y2.saturating_sub(self.y1)
    }
}

/// A layout list split into kind, box and children.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutNode<'a> {
    pub kind: LayoutKind,
    pub bbox: BBox,
    pub children: &'a [SExpr],
}

impl<'a> LayoutNode<'a> {
    /// View the items of a list.
    ///
    /// Returns `None` for an unknown tag, fewer than five items or
    /// non-integer coordinates.
    pub fn from_items(items: &'a [SExpr]) -> Option<Self> {
        let [tag, x1, y1, x2, y2, children @ ..] = items else {
            return None;
        };
        let kind = LayoutKind::from_tag(tag.as_symbol()?)?;
        let bbox = BBox::new(x1.as_int()?, y1.as_int()?, x2.as_int()?, y2.as_int()?);
        Some(Self {
            kind,
            bbox,
            children,
        })
    }

    /// View a node, if it is a layout list.
    pub fn from_sexpr(node: &'a SExpr) -> Option<Self> {
        Self::from_items(node.as_list()?)
    }

    /// Literal content of a word (its first child).
    pub fn content(&self) -> Option<&'a SExpr> {
        self.children.first()
    }
}
