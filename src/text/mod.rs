//! Hidden text layer: layout view, plain-text extraction and draw planning.

pub mod draw;
pub mod extract;
pub mod layout;

pub use draw::{
    plan_page, DrawInstruction, DrawList, PlanStats, TextBackend, TextDrawPlanner,
    BASE_FONT_SIZE,
};
pub use extract::{extract_page_text, filter_text, TextExtractor, TAB_SIZE};
pub use layout::{BBox, LayoutKind, LayoutNode};
