//! Planning of the invisible text layer.
//!
//! The planner walks a page layout tree and asks a [`TextBackend`] to draw
//! each word (or each loose run of text in a line or paragraph) at the
//! position of its bounding box, with a font size chosen so that the run is
//! exactly as wide as the box. The text is invisible; it only makes the page
//! image searchable and selectable.

use super::extract::TextExtractor;
use super::layout::{BBox, LayoutKind, LayoutNode};
use crate::error::Result;
use crate::sexpr::{Handlers, ListDisplay, SExpr, SExprVisitor};
use serde::{Deserialize, Serialize};

/// Font size text is measured at before fitting.
pub const BASE_FONT_SIZE: f64 = 10.0;

/// Advance width of a monospace glyph, in ems.
pub const MONOSPACE_ADVANCE: f64 = 0.6;

/// A positioned, size-fitted text run.
///
/// `y` is measured from the top of the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawInstruction {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
}

/// Sink for text runs, typically one page of a PDF.
pub trait TextBackend {
    /// Height of the page in page units.
    fn page_height(&self) -> f64;

    /// Natural width of `text` at `font_size`.
    fn string_width(&self, text: &str, font_size: f64) -> f64;

    /// Draw a run. An error rejects only this run.
    fn draw_text(&mut self, instruction: &DrawInstruction) -> Result<()>;
}

/// Backend that records instructions, measuring with monospace metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrawList {
    pub page_height: f64,
    pub instructions: Vec<DrawInstruction>,
}

impl DrawList {
    /// Create an empty list for a page of the given height.
    pub fn new(page_height: f64) -> Self {
        Self {
            page_height,
            instructions: Vec::new(),
        }
    }

    /// Check if nothing was drawn.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

impl TextBackend for DrawList {
    fn page_height(&self) -> f64 {
        self.page_height
    }

    fn string_width(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * MONOSPACE_ADVANCE * font_size
    }

    fn draw_text(&mut self, instruction: &DrawInstruction) -> Result<()> {
        self.instructions.push(instruction.clone());
        Ok(())
    }
}

/// Counters collected while planning a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanStats {
    /// Runs handed to the backend and accepted
    pub emitted: usize,
    /// Runs dropped for degenerate geometry or backend rejection
    pub skipped: usize,
}

/// Visitor emitting draw instructions for one page.
pub struct TextDrawPlanner<'a, B: TextBackend> {
    backend: &'a mut B,
    extractor: TextExtractor,
    handlers: Handlers<Self>,
    stats: PlanStats,
}

impl<'a, B: TextBackend> TextDrawPlanner<'a, B> {
    /// Create a planner drawing onto `backend`.
    pub fn new(backend: &'a mut B) -> Self {
        let handlers = Handlers::<Self>::new()
            .on_tags(LayoutKind::Word.tags(), Self::visit_word)
            .on_tags(LayoutKind::Line.tags(), Self::visit_loose)
            .on_tags(LayoutKind::Paragraph.tags(), Self::visit_loose)
            .on_tags(LayoutKind::Column.tags(), Self::visit_container)
            .on_tags(LayoutKind::Page.tags(), Self::visit_container);

        Self {
            backend,
            extractor: TextExtractor::new(),
            handlers,
            stats: PlanStats::default(),
        }
    }

    /// Plan a whole page tree.
    pub fn draw_page(&mut self, page: &SExpr) -> PlanStats {
        self.visit(page, ());
        self.stats
    }

    /// Counters so far.
    pub fn stats(&self) -> PlanStats {
        self.stats
    }

    fn visit_word(&mut self, items: &[SExpr], _: ()) -> Option<()> {
        let node = layout(items)?;
        let text = self.extractor.visit_list(items, ()).unwrap_or_default();
        if !text.is_empty() {
            self.draw(text, node.bbox);
        }
        Some(())
    }

    fn visit_loose(&mut self, items: &[SExpr], _: ()) -> Option<()> {
        let node = layout(items)?;

        let loose: Vec<String> = node
            .children
            .iter()
            .filter(|child| child.is_string())
            .filter_map(|child| self.extractor.visit(child, ()))
            .filter(|text| !text.is_empty())
            .collect();
        if !loose.is_empty() {
            self.draw(loose.join(node.kind.separator()), node.bbox);
        }

        for child in node.children.iter().filter(|child| !child.is_string()) {
            self.visit(child, ());
        }
        Some(())
    }

    fn visit_container(&mut self, items: &[SExpr], _: ()) -> Option<()> {
        let node = layout(items)?;
        for child in node.children {
            self.visit(child, ());
        }
        Some(())
    }

    fn draw(&mut self, text: String, bbox: BBox) {
        let desired_width = bbox.width() as f64;
        if desired_width <= 0.0 {
            log::warn!("Skipping \"{}\": empty bounding box {:?}", text, bbox);
            self.stats.skipped += 1;
            return;
        }

        let actual_width = self.backend.string_width(&text, BASE_FONT_SIZE);
        if actual_width.is_nan() || actual_width <= 0.0 {
            log::warn!("Skipping \"{}\": it has no measurable width", text);
            self.stats.skipped += 1;
            return;
        }

        let instruction = DrawInstruction {
            x: bbox.x1 as f64,
            y: self.backend.page_height() - bbox.y1 as f64,
            font_size: BASE_FONT_SIZE * desired_width / actual_width,
            text,
        };
        match self.backend.draw_text(&instruction) {
            Ok(()) => self.stats.emitted += 1,
            Err(err) => {
                log::warn!("Could not draw \"{}\": {}", instruction.text, err);
                self.stats.skipped += 1;
            }
        }
    }
}

impl<B: TextBackend> SExprVisitor for TextDrawPlanner<'_, B> {
    type Context = ();
    type Output = ();

    fn handlers(&self) -> &Handlers<Self> {
        &self.handlers
    }
}

fn layout(items: &[SExpr]) -> Option<LayoutNode<'_>> {
    let node = LayoutNode::from_items(items);
    if node.is_none() {
        log::warn!("Malformed text layout {}", ListDisplay(items));
    }
    node
}

/// Plan a page onto a fresh [`DrawList`].
pub fn plan_page(page: &SExpr, page_height: f64) -> DrawList {
    let mut list = DrawList::new(page_height);
    TextDrawPlanner::new(&mut list).draw_page(page);
    list
}
