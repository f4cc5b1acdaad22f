//! Invisible text drawn into a PDF content stream.

use crate::error::{Error, Result};
use crate::text::draw::{DrawInstruction, TextBackend, MONOSPACE_ADVANCE};
use lopdf::content::{Content, Operation};
use lopdf::{Object, StringFormat};
use std::collections::BTreeSet;

/// Resource name of the text font on every page.
pub const FONT_RESOURCE: &str = "F1";

/// Font used for the text layer; every glyph advances 0.6 em.
pub const FONT_NAME: &str = "Courier";

/// Text rendering mode 3: neither fill nor stroke.
const INVISIBLE: i64 = 3;

/// One page worth of invisible text operations.
#[derive(Debug, Clone)]
pub struct PdfCanvas {
    width: f64,
    height: f64,
    operations: Vec<Operation>,
    runs: usize,
    codes: BTreeSet<u16>,
}

impl PdfCanvas {
    /// Create a canvas for a page of the given size in points.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            operations: Vec::new(),
            runs: 0,
            codes: BTreeSet::new(),
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    /// Number of runs drawn.
    pub fn run_count(&self) -> usize {
        self.runs
    }

    /// Check if nothing was drawn.
    pub fn is_empty(&self) -> bool {
        self.runs == 0
    }

    /// Operations drawn so far.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Character codes drawn so far. Codes are Unicode scalar values of the
    /// Basic Multilingual Plane.
    pub fn codes(&self) -> &BTreeSet<u16> {
        &self.codes
    }

    /// Take the operations and the used codes out of the canvas.
    pub fn into_parts(self) -> (Vec<Operation>, BTreeSet<u16>) {
        (self.operations, self.codes)
    }

    /// Encode the operations as content stream bytes.
    pub fn encode(self) -> Result<Vec<u8>> {
        Ok(Content {
            operations: self.operations,
        }
        .encode()?)
    }
}

impl TextBackend for PdfCanvas {
    fn page_height(&self) -> f64 {
        self.height
    }

    fn string_width(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * MONOSPACE_ADVANCE * font_size
    }

    fn draw_text(&mut self, instruction: &DrawInstruction) -> Result<()> {
        let codes = encode_identity_h(&instruction.text)?;
        let mut encoded = Vec::with_capacity(codes.len() * 2);
        for code in &codes {
            encoded.extend_from_slice(&code.to_be_bytes());
        }
        self.codes.extend(codes);
        // Instructions are top-down; PDF text space is bottom-up.
        let baseline = self.height - instruction.y;

        self.operations.extend([
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![
                    Object::Name(FONT_RESOURCE.as_bytes().to_vec()),
                    Object::Real(instruction.font_size as f32),
                ],
            ),
            Operation::new("Tr", vec![Object::Integer(INVISIBLE)]),
            Operation::new(
                "Td",
                vec![
                    Object::Real(instruction.x as f32),
                    Object::Real(baseline as f32),
                ],
            ),
            Operation::new("Tj", vec![Object::String(encoded, StringFormat::Hexadecimal)]),
            Operation::new("ET", vec![]),
        ]);
        self.runs += 1;
        Ok(())
    }
}

/// Encode text as two-byte codes for an `Identity-H` font.
///
/// The code of a character is its Unicode value and a newline becomes a
/// space. Characters outside the Basic Multilingual Plane have no code and
/// are rejected.
fn encode_identity_h(text: &str) -> Result<Vec<u16>> {
    text.chars()
        .map(|c| match c {
            '\n' => Ok(0x20),
            _ => u16::try_from(u32::from(c)).map_err(|_| {
                Error::Render(format!(
                    "character {:?} (U+{:04X}) is outside the Basic Multilingual Plane",
                    c,
                    u32::from(c)
                ))
            }),
        })
        .collect()
}
