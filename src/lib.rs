//! # djvu2pdf
//!
//! Conversion of DjVu documents into searchable PDF files.
//!
//! DjVu keeps its hidden text layer and its outline as S-expressions. This
//! library parses them, walks them with table-driven visitors and writes a
//! PDF with an invisible text layer aligned to the page, the page
//! backgrounds and a bookmark tree.
//!
//! ## Quick Start
//!
//! ```no_run
//! use djvu2pdf::{convert_file, ConvertOptions};
//!
//! fn main() -> djvu2pdf::Result<()> {
//!     let result = convert_file("book.djvu", "book.pdf", &ConvertOptions::default())?;
//!     println!("{} pages, {} bookmarks", result.page_count, result.outline_items);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **S-expressions**: parser and printer for the djvulibre syntax
//! - **Visitors**: handler tables keyed by node kind and list tag
//! - **Outline**: bookmarks with configurable page references and offset
//! - **Text layer**: plain-text extraction and invisible text placement
//! - **Parallel processing**: pages are planned on the rayon thread pool

pub mod convert;
pub mod detect;
pub mod error;
pub mod outline;
pub mod render;
pub mod sexpr;
pub mod source;
pub mod text;

// Re-export commonly used types
pub use convert::{
    ConversionStats, ConvertOptions, ConvertedDocument, Converter, ErrorMode, PageSelection,
};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_djvu, DjvuFormat, DjvuKind};
pub use error::{Error, Result};
pub use outline::{Outline, OutlineItem, OutlineOptions, OutlineTransformer, PageRefPolicy};
pub use render::{JsonFormat, PageImage, PdfAssembler, PdfCanvas};
pub use sexpr::{parse as parse_sexpr, Handlers, SExpr, SExprVisitor};
pub use source::{DocumentSource, Djvused, ImageMode, MemorySource, WithBackgrounds};
pub use text::{DrawInstruction, TextBackend, TextDrawPlanner, TextExtractor};

use std::path::Path;

/// Open a DjVu file for reading through djvused.
///
/// The file header is checked first, so non-DjVu input fails fast with
/// [`Error::UnknownFormat`].
///
/// # Example
///
/// ```no_run
/// use djvu2pdf::{open, DocumentSource};
///
/// let source = open("book.djvu").unwrap();
/// println!("Pages: {}", source.page_count().unwrap());
/// ```
pub fn open<P: AsRef<Path>>(path: P) -> Result<Djvused> {
    let format = detect_format_from_path(&path)?;
    log::debug!("{}: {}", path.as_ref().display(), format);
    Djvused::open(path)
}

/// Convert a DjVu file and write the PDF to `dest`.
pub fn convert_file<P, Q>(src: P, dest: Q, options: &ConvertOptions) -> Result<ConvertedDocument>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let source = open(src)?;
    let result = Converter::new(options.clone()).convert(&source)?;
    std::fs::write(dest, &result.pdf)?;
    Ok(result)
}

/// Extract the plain text of a DjVu file, pages separated by form feeds.
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    convert::extract_text(&open(path)?, &PageSelection::All)
}

/// Read the outline of a DjVu file as JSON.
pub fn outline_to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let source = open(path)?;
    let items = Converter::default().outline_items(&source)?;
    render::to_json(&items, format)
}
